use std::env;
use std::fs;
use std::path::Path;

use bytes::Bytes;

use crate::codec::h264::AvcDecoderConfiguration;
use crate::error::{MuxError, Result};

/// Length prefix width used by MP4/DASH samples unless told otherwise.
pub const DEFAULT_NALU_LENGTH: usize = 4;

/// Widest NAL length prefix accepted.
pub const MAX_NALU_LENGTH: usize = 8;

const CONFIG_PATHS: [&str; 2] = ["./psmux.toml", "./psmux_config.toml"];

/// Session configuration read by every sample a muxer processes.
///
/// Set once when a stream starts (or when its codec configuration changes);
/// never modified by the muxer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxerConfig {
    nalu_length: usize,
    sps_pps: Bytes,
    audio_oid: Bytes,
    has_audio: bool,
    has_video: bool,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            nalu_length: DEFAULT_NALU_LENGTH,
            sps_pps: Bytes::new(),
            audio_oid: Bytes::new(),
            has_audio: false,
            has_video: true,
        }
    }
}

impl MuxerConfig {
    /// Creates the default configuration: 4-byte prefixes, video only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with overrides from a config file and the
    /// environment, in that order.
    ///
    /// Recognized keys are `nalu_length`, `has_audio` and `has_video`, read
    /// from `./psmux.toml` or `./psmux_config.toml` and from the
    /// `PSMUX_NALU_LENGTH`, `PSMUX_HAS_AUDIO` and `PSMUX_HAS_VIDEO` variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        for path in &CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                config.apply_file(&content)?;
            }
        }

        if let Ok(value) = env::var("PSMUX_NALU_LENGTH") {
            config.apply("nalu_length", &value)?;
        }
        if let Ok(value) = env::var("PSMUX_HAS_AUDIO") {
            config.apply("has_audio", &value)?;
        }
        if let Ok(value) = env::var("PSMUX_HAS_VIDEO") {
            config.apply("has_video", &value)?;
        }

        Ok(config)
    }

    /// Applies `key = value` lines. Comments and unknown keys are ignored.
    pub fn apply_file(&mut self, content: &str) -> Result<()> {
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.apply(key.trim(), value)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "nalu_length" => self.set_nalu_length(value.trim().parse()?),
            "has_audio" => {
                self.has_audio = parse_flag(key, value)?;
                Ok(())
            }
            "has_video" => {
                self.has_video = parse_flag(key, value)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Width in bytes of the NAL length prefixes in incoming samples.
    pub fn nalu_length(&self) -> usize {
        self.nalu_length
    }

    /// Sets the NAL length prefix width (1 to 8 bytes).
    pub fn set_nalu_length(&mut self, nalu_length: usize) -> Result<()> {
        if nalu_length == 0 || nalu_length > MAX_NALU_LENGTH {
            return Err(MuxError::Configuration(format!(
                "NAL length prefix must be 1 to {} bytes, got {}",
                MAX_NALU_LENGTH, nalu_length
            )));
        }
        self.nalu_length = nalu_length;
        Ok(())
    }

    /// Length-prefixed parameter set NAL units injected before key pictures.
    pub fn sps_pps(&self) -> &[u8] {
        &self.sps_pps
    }

    /// Stores parameter sets, already behind `nalu_length`-byte prefixes.
    pub fn set_sps_pps(&mut self, sps_pps: impl Into<Bytes>) {
        self.sps_pps = sps_pps.into();
    }

    /// Takes the prefix width and parameter sets from an `avcC` record.
    pub fn set_avc_decoder_configuration(&mut self, avcc: &[u8]) -> Result<()> {
        let record = AvcDecoderConfiguration::parse(avcc)?;
        let sps_pps = record.length_prefixed_parameter_sets()?;
        self.set_nalu_length(record.nalu_length)?;
        self.sps_pps = Bytes::from(sps_pps);
        Ok(())
    }

    /// Opaque audio object descriptor carried in the program stream map.
    pub fn audio_oid(&self) -> &[u8] {
        &self.audio_oid
    }

    /// Stores the audio object descriptor, embedded verbatim.
    pub fn set_audio_oid(&mut self, audio_oid: impl Into<Bytes>) {
        self.audio_oid = audio_oid.into();
    }

    /// Whether an audio elementary stream is multiplexed.
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Enables or disables the audio elementary stream.
    pub fn set_has_audio(&mut self, has_audio: bool) {
        self.has_audio = has_audio;
    }

    /// Whether a video elementary stream is multiplexed.
    pub fn has_video(&self) -> bool {
        self.has_video
    }

    /// Enables or disables the video elementary stream.
    pub fn set_has_video(&mut self, has_video: bool) {
        self.has_video = has_video;
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MuxError::Configuration(format!(
            "{} expects a boolean, got {:?}",
            key, other
        ))),
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# psmux configuration
# Values here are overridden by PSMUX_* environment variables.

# Width of the NAL length prefixes in incoming samples
nalu_length = 4

# Elementary streams present in the program stream
has_video = true
has_audio = false
"#;
        fs::write(path, template)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = MuxerConfig::new();
        assert_eq!(config.nalu_length(), 4);
        assert!(config.sps_pps().is_empty());
        assert!(config.audio_oid().is_empty());
        assert!(config.has_video());
        assert!(!config.has_audio());
    }

    #[test]
    fn test_nalu_length_bounds() {
        let mut config = MuxerConfig::new();
        assert!(matches!(config.set_nalu_length(0), Err(MuxError::Configuration(_))));
        assert!(matches!(config.set_nalu_length(9), Err(MuxError::Configuration(_))));
        config.set_nalu_length(2).unwrap();
        assert_eq!(config.nalu_length(), 2);
    }

    #[test]
    fn test_apply_file() {
        let mut config = MuxerConfig::new();
        config
            .apply_file("# comment\nnalu_length = 2\nhas_audio = \"true\"\nhas_video=no\nother = 1\n")
            .unwrap();
        assert_eq!(config.nalu_length(), 2);
        assert!(config.has_audio());
        assert!(!config.has_video());
    }

    #[test]
    fn test_apply_file_errors() {
        let mut config = MuxerConfig::new();
        assert!(matches!(
            config.apply_file("nalu_length = four"),
            Err(MuxError::ParseInt(_))
        ));
        assert!(matches!(
            config.apply_file("has_audio = maybe"),
            Err(MuxError::Configuration(_))
        ));
    }

    #[test]
    fn test_avc_decoder_configuration() {
        let avcc = [
            0x01, 0x42, 0xe0, 0x0d, 0xfd, 0xe1, 0x00, 0x02, 0x27, 0x42, 0x01, 0x00, 0x01, 0x28,
        ];
        let mut config = MuxerConfig::new();
        config.set_avc_decoder_configuration(&avcc).unwrap();
        assert_eq!(config.nalu_length(), 2);
        assert_eq!(config.sps_pps(), &[0x00, 0x02, 0x27, 0x42, 0x00, 0x01, 0x28]);
    }

    #[test]
    fn test_config_template() {
        let dir = std::env::temp_dir().join(format!("psmux-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("psmux.toml");
        create_default_config_template(&path).unwrap();

        let mut config = MuxerConfig::new();
        config.apply_file(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config, MuxerConfig::new());

        fs::remove_dir_all(&dir).unwrap();
    }
}
