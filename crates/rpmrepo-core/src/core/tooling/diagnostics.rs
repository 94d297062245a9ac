pub mod commands {
    pub const PULL: &str = "RR101";
    pub const INDEX: &str = "RR110";
    pub const PUSH: &str = "RR120";
    pub const ENUMERATE_CACHE: &str = "RR130";
}

pub mod preconditions {
    pub const REPO_NOT_READY: &str = "RR150";
    pub const INDEX_NOT_READY: &str = "RR151";
}
