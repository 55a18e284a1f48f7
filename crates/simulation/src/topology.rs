//! Initial topology: edge-list files and generated graphs.
//!
//! The file format is one directed edge per line, `<src>--<dst>`, as found
//! in the body of a DOT graph. Lines without `--` (headers, braces, blank
//! lines) are ignored and anything after the destination's digits is
//! dropped, so `3--7;` and `3 -- 7 [color=red]` both read as `3 -> 7`.

use gossipsim_types::NodeIndex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("cannot read topology file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: cannot parse edge {content:?}")]
    Parse { line: usize, content: String },
}

/// Directed edges in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeList {
    edges: Vec<(NodeIndex, NodeIndex)>,
}

impl EdgeList {
    pub fn new(edges: Vec<(NodeIndex, NodeIndex)>) -> Self {
        Self { edges }
    }

    pub fn parse(input: &str) -> Result<Self, TopologyError> {
        let mut edges = Vec::new();
        for (number, line) in input.lines().enumerate() {
            let Some((source, destination)) = line.split_once("--") else {
                continue;
            };
            let parse_error = || TopologyError::Parse {
                line: number + 1,
                content: line.to_string(),
            };
            let source = source.trim().parse().map_err(|_| parse_error())?;
            let destination = destination.trim_start();
            let digits = destination
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(destination.len());
            let destination = destination[..digits].parse().map_err(|_| parse_error())?;
            edges.push((source, destination));
        }
        Ok(Self { edges })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Each node picks `min..=max` distinct random peers.
    ///
    /// Pairs are emitted once, in the direction they were first drawn, so the
    /// list never holds both `a--b` and `b--a`.
    pub fn random(num_nodes: u32, min_degree: u32, max_degree: u32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut seen = BTreeSet::new();
        let mut edges = Vec::new();
        if num_nodes <= 1 {
            return Self { edges };
        }
        let others: Vec<NodeIndex> = (0..num_nodes).collect();
        for source in 0..num_nodes {
            let wanted = rng.gen_range(min_degree..=max_degree) as usize;
            let picks = others
                .choose_multiple(&mut rng, (wanted + 1).min(others.len()))
                .copied()
                .filter(|&peer| peer != source)
                .take(wanted);
            for destination in picks.collect::<Vec<_>>() {
                let pair = (source.min(destination), source.max(destination));
                if seen.insert(pair) {
                    edges.push((source, destination));
                }
            }
        }
        Self { edges }
    }

    pub fn edges(&self) -> &[(NodeIndex, NodeIndex)] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl fmt::Display for EdgeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (source, destination) in &self.edges {
            writeln!(f, "{source}--{destination}")?;
        }
        Ok(())
    }
}
