pub mod config_ssh;
