pub mod main_middleware;
