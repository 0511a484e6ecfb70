pub mod cli_options;
