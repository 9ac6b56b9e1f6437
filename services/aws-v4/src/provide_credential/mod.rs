mod assume_role;
pub use assume_role::AssumeRoleCredentialProvider;

mod chain;
pub use chain::ProvideCredentialChain;

mod default;
pub use default::DefaultCredentialProvider;

mod ecs;
pub use ecs::EcsCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod imds;
pub use imds::ImdsCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;

#[cfg(test)]
mod testing;
