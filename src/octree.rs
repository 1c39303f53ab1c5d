use alloc::vec::Vec;

use rgb::RGB8;

use crate::buffer::ColorSum;
use crate::color::Rgbf;
use crate::histogram::HistEntry;

const DEPTH: usize = 8;

#[derive(Debug, Clone, Default)]
struct Node {
    /// Sum over every pixel in this subtree.
    sum: ColorSum,
    children: [Option<u32>; 8],
    leaf: bool,
}

/// Uniform octree over RGB space, stored as an index arena.
///
/// Each level splits every channel in half, so depth 8 addresses single
/// colors. Reduction folds the children of the lightest nodes at the deepest
/// level back into their parent until the leaf count fits.
#[derive(Debug)]
struct Octree {
    nodes: Vec<Node>,
    /// Interior nodes per depth.
    interior: [Vec<u32>; DEPTH],
    leaves: usize,
}

#[inline]
fn child_index(c: RGB8, level: usize) -> usize {
    let shift = 7 - level;
    let r = ((c.r >> shift) & 1) as usize;
    let g = ((c.g >> shift) & 1) as usize;
    let b = ((c.b >> shift) & 1) as usize;
    (r << 2) | (g << 1) | b
}

impl Octree {
    fn new() -> Self {
        Self {
            nodes: alloc::vec![Node::default()],
            interior: Default::default(),
            leaves: 0,
        }
    }

    fn insert(&mut self, color: RGB8, count: u64) {
        let mut idx = 0usize;
        for level in 0..=DEPTH {
            self.nodes[idx].sum.add(color, count);
            if level == DEPTH {
                if !self.nodes[idx].leaf {
                    self.nodes[idx].leaf = true;
                    self.leaves += 1;
                }
                return;
            }

            let slot = child_index(color, level);
            idx = match self.nodes[idx].children[slot] {
                Some(child) => child as usize,
                None => {
                    if self.nodes[idx].children.iter().all(Option::is_none) {
                        self.interior[level].push(idx as u32);
                    }
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[idx].children[slot] = Some(child as u32);
                    child
                }
            };
        }
    }

    /// Merge leaves bottom-up until at most `max_leaves` remain.
    fn reduce(&mut self, max_leaves: usize) {
        for level in (0..DEPTH).rev() {
            if self.leaves <= max_leaves {
                return;
            }

            let mut candidates = core::mem::take(&mut self.interior[level]);
            candidates.sort_unstable_by_key(|&i| (self.nodes[i as usize].sum.count(), i));

            for idx in candidates {
                if self.leaves <= max_leaves {
                    return;
                }
                let node = &mut self.nodes[idx as usize];
                let children = node.children.iter().filter(|c| c.is_some()).count();
                node.children = [None; 8];
                node.leaf = true;
                self.leaves = self.leaves + 1 - children;
            }
        }
    }

    /// Leaf means in depth-first child order.
    fn centroids(&self) -> Vec<Rgbf> {
        let mut out = Vec::with_capacity(self.leaves);
        let mut stack = alloc::vec![0u32];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.leaf {
                if let Some(mean) = node.sum.mean() {
                    out.push(mean);
                }
                continue;
            }
            stack.extend(node.children.iter().rev().flatten());
        }
        out
    }
}

/// Octree quantization over a distinct-color histogram. Returns at most
/// `max_colors` leaf means.
pub fn octree(histogram: &[HistEntry], max_colors: usize) -> Vec<Rgbf> {
    if histogram.is_empty() || max_colors == 0 {
        return Vec::new();
    }

    let mut tree = Octree::new();
    for e in histogram {
        tree.insert(e.color, e.count);
    }
    tree.reduce(max_colors);
    tree.centroids()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::build_histogram;

    #[test]
    fn exact_when_colors_fit() {
        let hist = build_histogram(&[
            RGB8::new(255, 0, 0),
            RGB8::new(0, 255, 0),
            RGB8::new(0, 0, 255),
        ]);
        let mut result = octree(&hist, 8);
        result.sort_by(|a, b| a.r.total_cmp(&b.r).then(a.g.total_cmp(&b.g)));
        assert_eq!(
            result,
            [
                Rgbf::new(0.0, 0.0, 255.0),
                Rgbf::new(0.0, 255.0, 0.0),
                Rgbf::new(255.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn never_exceeds_max_colors() {
        let pixels: Vec<RGB8> = (0..4096u32)
            .map(|i| RGB8::new((i % 16 * 16) as u8, (i / 16 % 16 * 16) as u8, (i / 256 * 16) as u8))
            .collect();
        let hist = build_histogram(&pixels);
        for k in [1, 2, 5, 8, 17, 64, 300] {
            let result = octree(&hist, k);
            assert!(!result.is_empty());
            assert!(result.len() <= k, "k={k} produced {}", result.len());
        }
    }

    #[test]
    fn merged_leaf_is_mean_of_members() {
        let hist = build_histogram(&[
            RGB8::new(10, 10, 10),
            RGB8::new(12, 10, 10),
            RGB8::new(14, 10, 10),
        ]);
        assert_eq!(octree(&hist, 1), [Rgbf::new(12.0, 10.0, 10.0)]);
    }

    #[test]
    fn deterministic() {
        let pixels: Vec<RGB8> = (0..1000u32)
            .map(|i| RGB8::new((i * 7) as u8, (i * 13) as u8, (i * 29) as u8))
            .collect();
        let hist = build_histogram(&pixels);
        assert_eq!(octree(&hist, 12), octree(&hist, 12));
    }
}
