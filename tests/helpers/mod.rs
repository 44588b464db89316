pub mod mock_config;
