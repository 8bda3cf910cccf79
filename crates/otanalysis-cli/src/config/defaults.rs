use otanalysis::engine::config::AnalysisConfig;

/// Front-end defaults layered under the file and the command line.
pub struct DefaultsConfig {
    pub analysis: AnalysisConfig,
    pub results_file: String,
    pub rejected_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            results_file: "otanalysis_results.tsv".to_string(),
            rejected_dir: "File_rejected".to_string(),
        }
    }
}
