pub mod fs_size_calculator;
pub mod traits;
#[cfg(test)]
pub mod init_test_environment;
