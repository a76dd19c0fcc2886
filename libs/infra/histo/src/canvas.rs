// [libs/infra/histo/src/canvas.rs]
//! Canvas layout DSL: `name;title;nPadsX;nPadsY;pad1;..;padN`,
//! where each pad is `gridX,gridY,logX,logY,logZ,(objName,opt),..`. The
//! server defers assembling a canvas until every histogram it references
//! has arrived at least once.

use crate::errors::{HistoError, Result};

/// One pad of a canvas: its position in the pad grid, its log-scale axes,
/// and the histograms/profiles drawn in it (name, draw option).
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasPad {
    /// Column of this pad in the canvas' pad grid.
    pub grid_x: u32,
    /// Row of this pad in the canvas' pad grid.
    pub grid_y: u32,
    /// Whether the x axis is drawn log-scale.
    pub log_x: bool,
    /// Whether the y axis is drawn log-scale.
    pub log_y: bool,
    /// Whether the z axis (2D color scale) is drawn log-scale.
    pub log_z: bool,
    /// `(object name, draw option)` pairs drawn in this pad, in draw order.
    pub objects: Vec<(String, String)>,
}

impl CanvasPad {
    fn encode(&self) -> String {
        let mut s = format!("{},{},{},{},{}", self.grid_x, self.grid_y, self.log_x as u8, self.log_y as u8, self.log_z as u8);
        for (name, opt) in &self.objects {
            s.push_str(&format!(",({name},{opt})"));
        }
        s
    }

    fn parse(s: &str) -> Result<Self> {
        let tokens = split_top_level_commas(s);
        if tokens.len() < 5 {
            return Err(HistoError::InvalidCanvasDsl(s.to_string()));
        }
        let grid_x = tokens[0].trim().parse().map_err(|_| HistoError::InvalidCanvasDsl(s.to_string()))?;
        let grid_y = tokens[1].trim().parse().map_err(|_| HistoError::InvalidCanvasDsl(s.to_string()))?;
        let log_x = tokens[2].trim() == "1";
        let log_y = tokens[3].trim() == "1";
        let log_z = tokens[4].trim() == "1";

        let mut objects = Vec::new();
        for tok in &tokens[5..] {
            let tok = tok.trim();
            let inner = tok.strip_prefix('(').and_then(|t| t.strip_suffix(')')).ok_or_else(|| HistoError::InvalidCanvasDsl(s.to_string()))?;
            let (name, opt) = inner.split_once(',').ok_or_else(|| HistoError::InvalidCanvasDsl(s.to_string()))?;
            objects.push((name.to_string(), opt.to_string()));
        }

        Ok(Self { grid_x, grid_y, log_x, log_y, log_z, objects })
    }
}

/// A parsed canvas layout: its pad grid dimensions and the per-pad object
/// assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    /// Canvas name, used as its registry key.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Number of pad columns.
    pub n_pads_x: u32,
    /// Number of pad rows.
    pub n_pads_y: u32,
    /// The canvas' pads, in declaration order.
    pub pads: Vec<CanvasPad>,
}

impl Canvas {
    /// Encodes this canvas back into its DSL string form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut parts = vec![self.name.clone(), self.title.clone(), self.n_pads_x.to_string(), self.n_pads_y.to_string()];
        parts.extend(self.pads.iter().map(CanvasPad::encode));
        parts.join(";")
    }

    /// Parses a canvas DSL string (`name;title;nPadsX;nPadsY;pad1;..;padN`).
    ///
    /// # Errors
    /// Returns [`HistoError::InvalidCanvasDsl`] if any field is missing or malformed.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');
        let name = parts.next().ok_or_else(|| HistoError::InvalidCanvasDsl(s.to_string()))?.to_string();
        let title = parts.next().ok_or_else(|| HistoError::InvalidCanvasDsl(s.to_string()))?.to_string();
        let n_pads_x = parts.next().ok_or_else(|| HistoError::InvalidCanvasDsl(s.to_string()))?.parse().map_err(|_| HistoError::InvalidCanvasDsl(s.to_string()))?;
        let n_pads_y = parts.next().ok_or_else(|| HistoError::InvalidCanvasDsl(s.to_string()))?.parse().map_err(|_| HistoError::InvalidCanvasDsl(s.to_string()))?;
        let pads = parts.map(CanvasPad::parse).collect::<Result<Vec<_>>>()?;
        Ok(Self { name, title, n_pads_x, n_pads_y, pads })
    }

    /// Names of every histogram/profile object referenced by any pad,
    /// deduplicated in first-seen order. The server waits for all of
    /// these to have arrived before assembling the canvas.
    #[must_use]
    pub fn referenced_objects(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for pad in &self.pads {
            for (name, _) in &pad.objects {
                if !seen.contains(&name.as_str()) {
                    seen.push(name.as_str());
                }
            }
        }
        seen
    }
}

/// Splits `s` on top-level commas only, treating `(..)` as opaque so a
/// `(objName,opt)` tuple's internal comma is not mistaken for a field
/// separator.
fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut depth = 0i32;
    let mut start = 0;
    let mut out = Vec::new();
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_pad_canvas_with_two_objects() {
        let dsl = "sts_overview;STS overview;1;1;0,0,0,1,0,(sts_cluster_size,hist),(sts_hit_time,hist)";
        let canvas = Canvas::parse(dsl).unwrap();
        assert_eq!(canvas.name, "sts_overview");
        assert_eq!(canvas.n_pads_x, 1);
        assert_eq!(canvas.pads.len(), 1);
        let pad = &canvas.pads[0];
        assert!(!pad.log_x);
        assert!(pad.log_y);
        assert_eq!(pad.objects, vec![("sts_cluster_size".to_string(), "hist".to_string()), ("sts_hit_time".to_string(), "hist".to_string())]);
    }

    #[test]
    fn encode_then_parse_round_trips() {
        let canvas = Canvas {
            name: "trd".to_string(),
            title: "TRD cluster diagnostics".to_string(),
            n_pads_x: 2,
            n_pads_y: 1,
            pads: vec![
                CanvasPad { grid_x: 0, grid_y: 0, log_x: false, log_y: false, log_z: true, objects: vec![("trd_cluster_charge".to_string(), "colz".to_string())] },
                CanvasPad { grid_x: 1, grid_y: 0, log_x: true, log_y: false, log_z: false, objects: vec![] },
            ],
        };
        let dsl = canvas.encode();
        let parsed = Canvas::parse(&dsl).unwrap();
        assert_eq!(parsed, canvas);
    }

    #[test]
    fn referenced_objects_deduplicates_across_pads() {
        let dsl = "c;t;2;1;0,0,0,0,0,(a,hist);1,0,0,0,0,(a,hist),(b,hist)";
        let canvas = Canvas::parse(dsl).unwrap();
        assert_eq!(canvas.referenced_objects(), vec!["a", "b"]);
    }

    #[test]
    fn rejects_a_pad_missing_required_fields() {
        assert!(Canvas::parse("c;t;1;1;0,0").is_err());
    }

    #[test]
    fn rejects_an_unparenthesized_object_entry() {
        assert!(Canvas::parse("c;t;1;1;0,0,0,0,0,notparen").is_err());
    }
}
