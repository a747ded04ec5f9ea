use cs_sim::DriverProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingConfig,
    PreparingWorkspace,
    LoadingModel,
    ConnectingSolver,
    ReadingCase,
    Simulating,
    ExportingCheckpoint,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingConfig => "Loading config",
            RunStage::PreparingWorkspace => "Preparing workspace",
            RunStage::LoadingModel => "Loading model",
            RunStage::ConnectingSolver => "Connecting field solver",
            RunStage::ReadingCase => "Reading case",
            RunStage::Simulating => "Simulating",
            RunStage::ExportingCheckpoint => "Exporting checkpoint",
            RunStage::SavingResults => "Saving results",
            RunStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub driver: Option<DriverProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            driver: None,
        }
    }
}
