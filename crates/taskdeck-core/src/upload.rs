use std::fmt;

/// Progress of a single attachment upload attempt.
///
/// The indicator is deliberately coarse: the flow has exactly two remote
/// steps and resets to `NoUpload` on completion or failure. The state is
/// transient and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    NoUpload,
    FetchingPresignedUrl,
    UploadingFile,
}

/// Inputs that move the upload state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEvent {
    /// The user submitted a held file.
    Submit,
    /// The pre-signed URL came back.
    UrlObtained,
    /// The transfer ended, successfully or not.
    Finished,
}

impl UploadState {
    /// Pure transition function. Events that make no sense in the current
    /// state leave it unchanged.
    pub fn apply(self, event: UploadEvent) -> UploadState {
        match (self, event) {
            (UploadState::NoUpload, UploadEvent::Submit) => UploadState::FetchingPresignedUrl,
            (UploadState::FetchingPresignedUrl, UploadEvent::UrlObtained) => {
                UploadState::UploadingFile
            }
            (UploadState::FetchingPresignedUrl, UploadEvent::Finished)
            | (UploadState::UploadingFile, UploadEvent::Finished) => UploadState::NoUpload,
            (state, _) => state,
        }
    }

    pub fn in_flight(&self) -> bool {
        !matches!(self, UploadState::NoUpload)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UploadState::NoUpload => "Idle",
            UploadState::FetchingPresignedUrl => "Requesting upload URL",
            UploadState::UploadingFile => "Uploading file",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
