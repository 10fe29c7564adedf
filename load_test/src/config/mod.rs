mod run_profiles;

pub use run_profiles::*;
