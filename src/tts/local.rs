//! Offline speech through the operating system's speech engine.

use std::io::ErrorKind;
use std::process::{Command, Stdio};

use super::{SpeechProvider, TtsError};

/// System speech engine (`say`, `spd-say`, `espeak`, or PowerShell).
pub struct LocalProvider {
    /// Words per minute.
    rate: u32,
}

impl LocalProvider {
    pub fn new(rate: u32) -> Self {
        Self { rate }
    }

    fn engines(&self, text: &str) -> Vec<Vec<String>> {
        let rate = self.rate.to_string();
        let owned = |parts: &[&str]| parts.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

        if cfg!(target_os = "macos") {
            vec![owned(&["say", "-r", &rate, text])]
        } else if cfg!(target_os = "windows") {
            // SAPI rate runs -10..10 with 0 at roughly 180 wpm
            let sapi_rate = ((i64::from(self.rate) - 180) / 20).clamp(-10, 10);
            let escaped = text.replace('\'', "''");
            vec![owned(&[
                "powershell",
                "-NoProfile",
                "-Command",
                &format!(
                    "Add-Type -AssemblyName System.Speech; \
                     $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                     $s.Rate = {sapi_rate}; $s.Speak('{escaped}')"
                ),
            ])]
        } else {
            vec![
                owned(&["spd-say", "--wait", text]),
                owned(&["espeak", "-s", &rate, text]),
                owned(&["espeak-ng", "-s", &rate, text]),
            ]
        }
    }
}

impl SpeechProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn speak(&self, text: &str) -> Result<(), TtsError> {
        let mut tried = Vec::new();

        for argv in self.engines(text) {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            tried.push(program.clone());

            match Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => {
                    tracing::debug!(program = %program, %status, "Speech engine failed");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(TtsError::NoEngine(tried.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engines_carry_text() {
        let provider = LocalProvider::new(180);
        let engines = provider.engines("All done!");
        assert!(!engines.is_empty());
        assert!(engines.iter().all(|argv| argv.iter().any(|a| a.contains("All done!"))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_rate_passed_to_espeak() {
        let engines = LocalProvider::new(200).engines("hi");
        let espeak = engines.iter().find(|argv| argv[0] == "espeak").unwrap();
        assert_eq!(espeak[1..3], ["-s".to_string(), "200".to_string()]);
    }
}
