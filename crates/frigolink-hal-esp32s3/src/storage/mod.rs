pub mod flash_config;
