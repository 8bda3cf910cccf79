use otanalysis::engine::config::AnalysisConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub results_path: PathBuf,
    /// `None` when routed files are not copied.
    pub rejected_dir: Option<PathBuf>,
    pub core_config: AnalysisConfig,
}
