//! Audio playback through a system player.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use super::TtsError;

/// Plays an audio buffer by writing it to a temp file and running a player.
#[derive(Debug, Clone, Default)]
pub struct AudioPlayer {
    /// Configured player command; the file path is appended.
    command: Option<String>,
}

impl AudioPlayer {
    pub fn new(command: Option<String>) -> Self {
        Self { command: command.filter(|c| !c.trim().is_empty()) }
    }

    /// Play `audio` (encoded as `extension`, e.g. "mp3").
    pub fn play(&self, audio: &[u8], extension: &str) -> Result<(), TtsError> {
        let mut file = tempfile::Builder::new()
            .prefix("titanium-tts-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        file.write_all(audio)?;
        file.flush()?;

        let path = file.path().to_string_lossy().into_owned();
        let candidates = self.candidates(&path);
        let mut tried = Vec::new();

        for argv in candidates {
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
                    return Err(TtsError::CommandFailed { program: program.clone(), status });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(TtsError::NoPlayer(tried.join(", ")))
    }

    fn candidates(&self, path: &str) -> Vec<Vec<String>> {
        if let Some(command) = &self.command {
            let expanded = shellexpand::tilde(command);
            let mut argv: Vec<String> = expanded.split_whitespace().map(str::to_string).collect();
            argv.push(path.to_string());
            return vec![argv];
        }

        default_players(path)
    }
}

fn default_players(path: &str) -> Vec<Vec<String>> {
    let argv = |parts: &[&str]| {
        let mut v: Vec<String> = parts.iter().map(|s| (*s).to_string()).collect();
        v.push(path.to_string());
        v
    };

    if cfg!(target_os = "macos") {
        vec![argv(&["afplay"])]
    } else if cfg!(target_os = "windows") {
        vec![vec![
            "powershell".to_string(),
            "-NoProfile".to_string(),
            "-Command".to_string(),
            format!(
                "Add-Type -AssemblyName presentationCore; $p = New-Object System.Windows.Media.MediaPlayer; \
                 $p.Open('{path}'); $p.Play(); Start-Sleep -Milliseconds 500; \
                 while ($p.Position -lt $p.NaturalDuration.TimeSpan) {{ Start-Sleep -Milliseconds 100 }}"
            ),
        ]]
    } else {
        vec![
            argv(&["mpg123", "-q"]),
            argv(&["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"]),
            argv(&["mpv", "--no-video", "--really-quiet"]),
        ]
    }
}
