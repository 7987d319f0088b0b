//! Haar cascade model loaded from OpenCV cascade XML
//!
//! Only the `opencv-cascade-classifier` layout written by
//! `opencv_traincascade` is supported (BOOST stages, HAAR features, ordered
//! tree or stump weak classifiers). The legacy `<trees>` layout and
//! categorical (LBP) features are rejected.

use crate::integral::IntegralImage;
use crate::DetectionError;
use roxmltree::{Document, Node};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Weighted rectangle inside the detection window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f64,
}

/// Haar-like feature: weighted sum of up to three rectangle sums
#[derive(Debug, Clone, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

impl HaarFeature {
    /// Raw (unnormalized) feature response for the window at (`wx`, `wy`)
    #[inline]
    fn evaluate(&self, integral: &IntegralImage, wx: u32, wy: u32) -> f64 {
        self.rects
            .iter()
            .map(|r| r.weight * integral.sum(wx + r.x, wy + r.y, r.width, r.height) as f64)
            .sum()
    }
}

/// Split node of a weak classifier tree
///
/// Positive child indices point at other nodes, zero or negative ones at
/// `leaves[-index]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub threshold: f64,
    pub classifiers: Vec<WeakClassifier>,
}

/// Boosted cascade of Haar classifiers
#[derive(Debug, Clone, PartialEq)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    /// Load a cascade from an OpenCV XML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DetectionError> {
        let path = path.as_ref();
        info!("Loading Haar cascade from {:?}", path);

        let contents = std::fs::read_to_string(path)?;
        let cascade = Self::from_xml(&contents)?;

        info!(
            "Haar cascade loaded ({} stages, {} features, window {}x{})",
            cascade.stages.len(),
            cascade.features.len(),
            cascade.window_width,
            cascade.window_height
        );
        Ok(cascade)
    }

    /// Parse a cascade from OpenCV XML text
    pub fn from_xml(xml: &str) -> Result<Self, DetectionError> {
        let doc = Document::parse(xml)
            .map_err(|e| DetectionError::CascadeFormat(format!("XML parse error: {e}")))?;

        let root = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "cascade")
            .ok_or_else(|| {
                if doc.descendants().any(|n| n.has_tag_name("trees")) {
                    DetectionError::UnsupportedCascade(
                        "legacy cascade layout (<trees>) is not supported".into(),
                    )
                } else {
                    DetectionError::CascadeFormat("missing <cascade> element".into())
                }
            })?;

        let stage_type = child_text(root, "stageType")?;
        if stage_type != "BOOST" {
            return Err(DetectionError::UnsupportedCascade(format!(
                "stage type {stage_type}"
            )));
        }
        let feature_type = child_text(root, "featureType")?;
        if feature_type != "HAAR" {
            return Err(DetectionError::UnsupportedCascade(format!(
                "feature type {feature_type}"
            )));
        }
        if let Some(params) = child(root, "featureParams") {
            if let Some(max_cat) = child(params, "maxCatCount") {
                let count: u32 = parse_value(node_text(max_cat), "maxCatCount")?;
                if count > 0 {
                    return Err(DetectionError::UnsupportedCascade(
                        "categorical features are not supported".into(),
                    ));
                }
            }
        }

        let window_width: u32 = parse_value(child_text(root, "width")?, "width")?;
        let window_height: u32 = parse_value(child_text(root, "height")?, "height")?;
        if window_width < 3 || window_height < 3 {
            return Err(DetectionError::CascadeFormat(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let features = required_child(root, "features")?
            .children()
            .filter(Node::is_element)
            .map(|n| parse_feature(n, window_width, window_height))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = required_child(root, "stages")?
            .children()
            .filter(Node::is_element)
            .map(|n| parse_stage(n, features.len()))
            .collect::<Result<Vec<_>, _>>()?;

        if stages.is_empty() {
            return Err(DetectionError::CascadeFormat("cascade has no stages".into()));
        }

        debug!(
            "Parsed cascade: {} stages, {} features",
            stages.len(),
            features.len()
        );

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    /// Training window size (width, height)
    #[must_use]
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage on the window whose top-left corner is (`wx`, `wy`)
    ///
    /// The window must lie inside the integral image.
    #[must_use]
    pub fn classify_window(&self, integral: &IntegralImage, wx: u32, wy: u32) -> bool {
        // Normalization uses the window shrunk by one pixel on each side
        let norm_w = self.window_width - 2;
        let norm_h = self.window_height - 2;
        let area = f64::from(norm_w) * f64::from(norm_h);
        let sum = integral.sum(wx + 1, wy + 1, norm_w, norm_h) as f64;
        let sq_sum = integral.squared_sum(wx + 1, wy + 1, norm_w, norm_h) as f64;
        let variance = area * sq_sum - sum * sum;
        if variance <= 0.0 {
            return false;
        }
        let norm_factor = variance.sqrt();
        // Near-flat windows (pixel std-dev <= 10) are skipped outright
        if area / norm_factor >= 0.1 {
            return false;
        }

        for stage in &self.stages {
            let mut stage_sum = 0.0;
            for weak in &stage.classifiers {
                stage_sum += self.evaluate_weak(weak, integral, wx, wy, norm_factor);
            }
            if stage_sum < stage.threshold {
                return false;
            }
        }
        true
    }

    fn evaluate_weak(
        &self,
        weak: &WeakClassifier,
        integral: &IntegralImage,
        wx: u32,
        wy: u32,
        norm_factor: f64,
    ) -> f64 {
        let mut idx = 0i32;
        loop {
            let node = &weak.nodes[idx as usize];
            let value = self.features[node.feature].evaluate(integral, wx, wy);
            idx = if value < node.threshold * norm_factor {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return weak.leaves[(-idx) as usize];
            }
        }
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn required_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, DetectionError> {
    child(node, name).ok_or_else(|| DetectionError::CascadeFormat(format!("missing <{name}>")))
}

fn node_text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("").trim()
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, DetectionError> {
    required_child(node, name).map(node_text)
}

fn parse_value<T: FromStr>(text: &str, what: &str) -> Result<T, DetectionError> {
    text.trim()
        .parse()
        .map_err(|_| DetectionError::CascadeFormat(format!("invalid {what}: {text:?}")))
}

fn parse_list<T: FromStr>(text: &str, what: &str) -> Result<Vec<T>, DetectionError> {
    text.split_whitespace()
        .map(|token| parse_value(token, what))
        .collect()
}

fn parse_feature(
    node: Node,
    window_width: u32,
    window_height: u32,
) -> Result<HaarFeature, DetectionError> {
    if let Some(tilted) = child(node, "tilted") {
        if node_text(tilted) != "0" {
            return Err(DetectionError::UnsupportedCascade(
                "tilted Haar features are not supported".into(),
            ));
        }
    }

    let mut rects = Vec::with_capacity(3);
    for rect_node in required_child(node, "rects")?
        .children()
        .filter(Node::is_element)
    {
        let values: Vec<f64> = parse_list(node_text(rect_node), "feature rect")?;
        if values.len() != 5 {
            return Err(DetectionError::CascadeFormat(format!(
                "feature rect needs 5 values, got {}",
                values.len()
            )));
        }
        if values[..4].iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
            return Err(DetectionError::CascadeFormat(format!(
                "feature rect has non-integral geometry: {values:?}"
            )));
        }
        // Checked in f64 before narrowing to u32
        if values[0] + values[2] > f64::from(window_width)
            || values[1] + values[3] > f64::from(window_height)
        {
            return Err(DetectionError::CascadeFormat(format!(
                "feature rect {:?} exceeds window {window_width}x{window_height}",
                &values[..4]
            )));
        }
        rects.push(WeightedRect {
            x: values[0] as u32,
            y: values[1] as u32,
            width: values[2] as u32,
            height: values[3] as u32,
            weight: values[4],
        });
    }

    if rects.is_empty() {
        return Err(DetectionError::CascadeFormat("feature has no rects".into()));
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: Node, feature_count: usize) -> Result<Stage, DetectionError> {
    let threshold: f64 = parse_value(child_text(node, "stageThreshold")?, "stageThreshold")?;

    let classifiers = required_child(node, "weakClassifiers")?
        .children()
        .filter(Node::is_element)
        .map(|n| parse_weak(n, feature_count))
        .collect::<Result<Vec<_>, _>>()?;

    if classifiers.is_empty() {
        return Err(DetectionError::CascadeFormat(
            "stage has no weak classifiers".into(),
        ));
    }

    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_weak(node: Node, feature_count: usize) -> Result<WeakClassifier, DetectionError> {
    let raw_nodes: Vec<f64> = parse_list(child_text(node, "internalNodes")?, "internalNodes")?;
    let leaves: Vec<f64> = parse_list(child_text(node, "leafValues")?, "leafValues")?;

    if raw_nodes.is_empty() || raw_nodes.len() % 4 != 0 {
        return Err(DetectionError::CascadeFormat(format!(
            "internalNodes must hold groups of 4 values, got {}",
            raw_nodes.len()
        )));
    }

    let nodes: Vec<TreeNode> = raw_nodes
        .chunks_exact(4)
        .map(|chunk| TreeNode {
            left: chunk[0] as i32,
            right: chunk[1] as i32,
            feature: chunk[2] as usize,
            threshold: chunk[3],
        })
        .collect();

    for (i, tree_node) in nodes.iter().enumerate() {
        if tree_node.feature >= feature_count {
            return Err(DetectionError::CascadeFormat(format!(
                "node {i} references feature {} of {feature_count}",
                tree_node.feature
            )));
        }
        for child_idx in [tree_node.left, tree_node.right] {
            let valid = if child_idx > 0 {
                // Children must point forward, which also rules out cycles
                (child_idx as usize) < nodes.len() && child_idx as usize > i
            } else {
                ((-child_idx) as usize) < leaves.len()
            };
            if !valid {
                return Err(DetectionError::CascadeFormat(format!(
                    "node {i} has invalid child index {child_idx}"
                )));
            }
        }
    }

    Ok(WeakClassifier { nodes, leaves })
}
