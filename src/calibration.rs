// Calibration offset persistence.
//
// Flat text file, one leg per line, three tab-separated degree offsets
// (coxa, femur, tibia). Loaded once at startup; a missing or malformed file
// is non-fatal and falls back to zero offsets with a telemetry warning.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};

pub type Offsets = [[f32; 3]; 6];

pub fn load(path: &Path) -> Result<Offsets> {
    let text = fs::read_to_string(path).map_err(|e| Error::CalibrationLoadFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse(&text).map_err(|reason| Error::CalibrationLoadFailure {
        path: path.display().to_string(),
        reason,
    })
}

/// Load, falling back to zero offsets when the file is absent or bad.
/// Returns the offsets and whether the fallback was taken.
pub fn load_or_default(path: &Path) -> (Offsets, bool) {
    match load(path) {
        Ok(offsets) => {
            info!(path = %path.display(), "calibration loaded");
            (offsets, false)
        }
        Err(e) => {
            warn!(error = %e, "calibration unavailable, using zero offsets");
            ([[0.0; 3]; 6], true)
        }
    }
}

fn parse(text: &str) -> std::result::Result<Offsets, String> {
    let mut offsets = [[0.0_f32; 3]; 6];
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    for (leg, row) in offsets.iter_mut().enumerate() {
        let line = lines.next().ok_or_else(|| format!("missing line for leg {leg}"))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(format!(
                "leg {leg}: expected 3 offsets, found {}",
                fields.len()
            ));
        }
        for (joint, field) in fields.iter().enumerate() {
            row[joint] = field
                .parse()
                .map_err(|_| format!("leg {leg}: bad offset {field:?}"))?;
        }
    }
    Ok(offsets)
}

pub fn save(path: &Path, offsets: &Offsets) -> Result<()> {
    let mut text = String::new();
    for row in offsets {
        text.push_str(&format!("{}\t{}\t{}\n", row[0], row[1], row[2]));
    }
    fs::write(path, text)?;
    info!(path = %path.display(), "calibration saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join("hexapod-cal-roundtrip");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("calibration.txt");

        let mut offsets = [[0.0_f32; 3]; 6];
        offsets[2] = [1.5, -2.0, 5.0];
        offsets[5] = [0.0, 3.0, -0.5];
        save(&path, &offsets).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, offsets);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_recoverable() {
        let path = Path::new("/nonexistent/calibration.txt");
        assert!(matches!(
            load(path),
            Err(Error::CalibrationLoadFailure { .. })
        ));
        let (offsets, warned) = load_or_default(path);
        assert_eq!(offsets, [[0.0; 3]; 6]);
        assert!(warned);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(parse("1\t2\n").is_err());
        assert!(parse("a\tb\tc\n").is_err());
        assert!(parse("").is_err());
        let six_lines = "0 0 0\n0 0 0\n0 0 0\n0 0 0\n0 0 0\n0 0 0\n";
        assert!(parse(six_lines).is_ok());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "0\t0\t0\n\n1\t2\t3\n0 0 0\n0 0 0\n0 0 0\n\n0 0 0\n";
        let offsets = parse(text).unwrap();
        assert_eq!(offsets[1], [1.0, 2.0, 3.0]);
    }
}
