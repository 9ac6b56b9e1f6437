mod env;
mod profile;

use loadsign_core::{Context, StaticEnv};
use loadsign_file_read_tokio::TokioFileRead;
use std::collections::HashMap;

pub fn testdata(name: &str) -> String {
    format!(
        "{}/testdata/{name}",
        std::env::current_dir()
            .expect("current_dir must exist")
            .to_string_lossy()
    )
}

pub fn create_test_context_with_env(envs: HashMap<String, String>) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    Context::new()
        .with_file_read(TokioFileRead)
        .with_env(StaticEnv {
            home_dir: None,
            envs,
        })
}
