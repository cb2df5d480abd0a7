#[derive(Debug, thiserror::Error)]
pub enum Error {
    // config
    #[error("failed to load Elftool.toml")]
    Config,
    #[error("profile `{0}` is not defined")]
    NoProfile(String),

    // dump
    #[error("failed to dump `{0}`")]
    Dump(String),
    #[error("failed to write output")]
    Output,

    // check
    #[error("no files to check")]
    NoInput,
    #[error("failed to collect files to check")]
    Collect,
    #[error("failed to load `{0}`")]
    Load(String),
    #[error("failed to load symbol list `{0}`")]
    LoadSymbols(String),
    #[error("invalid disallowed symbol pattern `{0}`")]
    ParseSymbolRegex(String),
    #[error("errors found when checking ELF files")]
    CheckError,
}
