/*!
    Output container format selection.
*/

/**
    Which muxer the output container uses.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Guess the format from the output path's extension.
    #[default]
    Guess,
    /// Force MP4 regardless of extension.
    Mp4,
    /// Force a specific muxer by FFmpeg short name.
    Named(String),
}

impl ContainerFormat {
    /**
        The explicit FFmpeg muxer name, or `None` to guess by extension.
    */
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Guess => None,
            Self::Mp4 => Some("mp4"),
            Self::Named(name) => Some(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(ContainerFormat::Guess.name(), None);
        assert_eq!(ContainerFormat::Mp4.name(), Some("mp4"));
        assert_eq!(ContainerFormat::Named("matroska".into()).name(), Some("matroska"));
    }
}
