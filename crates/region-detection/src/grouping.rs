//! Neighbor grouping of raw cascade hits
//!
//! A true object usually fires the cascade at several nearby positions and
//! scales. Hits are partitioned into clusters of similar rectangles, each
//! cluster is replaced by its average rectangle, clusters with too few members
//! are dropped, and weak clusters nested inside stronger ones are removed.

use character_recognition_common::Rectangle;

/// Two rectangles are similar when every edge moves by at most `delta`
fn similar(a: &Rectangle, b: &Rectangle, eps: f64) -> bool {
    let delta = eps
        * (f64::from(a.width.min(b.width)) + f64::from(a.height.min(b.height)))
        * 0.5;
    let close = |p: i64, q: i64| ((p - q).abs() as f64) <= delta;

    close(i64::from(a.x), i64::from(b.x))
        && close(i64::from(a.y), i64::from(b.y))
        && close(a.right() as i64, b.right() as i64)
        && close(a.bottom() as i64, b.bottom() as i64)
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Partition rectangles into equivalence classes of the similarity relation
///
/// Returns one class index per rectangle; classes are numbered in order of
/// their first member.
fn partition(rects: &[Rectangle], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let root_i = find(&mut parent, i);
                let root_j = find(&mut parent, j);
                if root_i != root_j {
                    parent[root_j.max(root_i)] = root_i.min(root_j);
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; rects.len()];
    let mut labels = Vec::with_capacity(rects.len());
    let mut class_count = 0;
    for i in 0..rects.len() {
        let root = find(&mut parent, i);
        if class_of_root[root] == usize::MAX {
            class_of_root[root] = class_count;
            class_count += 1;
        }
        labels.push(class_of_root[root]);
    }

    (labels, class_count)
}

/// Group raw hits, keeping clusters with more than `min_neighbors` members
///
/// With `min_neighbors == 0` the raw hits are returned unchanged.
#[must_use]
pub fn group_rectangles(rects: &[Rectangle], min_neighbors: u32, eps: f64) -> Vec<Rectangle> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, class_count) = partition(rects, eps);

    let mut sums = vec![[0u64; 4]; class_count];
    let mut counts = vec![0u32; class_count];
    for (rect, &class) in rects.iter().zip(&labels) {
        let acc = &mut sums[class];
        acc[0] += u64::from(rect.x);
        acc[1] += u64::from(rect.y);
        acc[2] += u64::from(rect.width);
        acc[3] += u64::from(rect.height);
        counts[class] += 1;
    }

    let averaged: Vec<Rectangle> = sums
        .iter()
        .zip(&counts)
        .map(|(acc, &n)| {
            let avg = |v: u64| (v as f64 / f64::from(n)).round() as u32;
            Rectangle::new(avg(acc[0]), avg(acc[1]), avg(acc[2]), avg(acc[3]))
        })
        .collect();

    let mut grouped = Vec::with_capacity(class_count);
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }

        let nested_in_stronger = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (f64::from(r2.width) * eps).round() as i64;
            let dy = (f64::from(r2.height) * eps).round() as i64;

            i64::from(r1.x) >= i64::from(r2.x) - dx
                && i64::from(r1.y) >= i64::from(r2.y) - dy
                && r1.right() as i64 <= r2.right() as i64 + dx
                && r1.bottom() as i64 <= r2.bottom() as i64 + dy
                && (n2 > n1.max(3) || n1 < 3)
        });

        if !nested_in_stronger {
            grouped.push(*r1);
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_neighbors_returns_raw() {
        let rects = vec![Rectangle::new(0, 0, 10, 10), Rectangle::new(1, 1, 10, 10)];
        assert_eq!(group_rectangles(&rects, 0, 0.2), rects);
    }

    #[test]
    fn test_cluster_is_averaged() {
        let rects = vec![
            Rectangle::new(100, 100, 50, 50),
            Rectangle::new(102, 101, 50, 50),
            Rectangle::new(104, 102, 50, 50),
            Rectangle::new(98, 99, 50, 50),
        ];
        let grouped = group_rectangles(&rects, 3, 0.2);
        assert_eq!(grouped, vec![Rectangle::new(101, 101, 50, 50)]);
    }

    #[test]
    fn test_small_clusters_are_dropped() {
        let rects = vec![
            Rectangle::new(0, 0, 40, 40),
            Rectangle::new(1, 0, 40, 40),
            Rectangle::new(300, 300, 40, 40),
        ];
        // Cluster sizes are 2 and 1; both need more than 2 members
        assert!(group_rectangles(&rects, 2, 0.2).is_empty());
        assert_eq!(group_rectangles(&rects, 1, 0.2).len(), 1);
    }

    #[test]
    fn test_weak_cluster_inside_strong_one_is_removed() {
        let mut rects = Vec::new();
        // Strong cluster: 6 hits around (100, 100, 80, 80)
        for offset in 0..6 {
            rects.push(Rectangle::new(100 + offset, 100, 80, 80));
        }
        // Weak cluster: 2 hits of a small box inside the strong one
        rects.push(Rectangle::new(120, 120, 20, 20));
        rects.push(Rectangle::new(121, 120, 20, 20));

        let grouped = group_rectangles(&rects, 1, 0.2);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].width, 80);
    }

    #[test]
    fn test_partition_is_transitive() {
        // a~b and b~c but a and c are too far apart directly
        let rects = vec![
            Rectangle::new(0, 0, 20, 20),
            Rectangle::new(4, 0, 20, 20),
            Rectangle::new(8, 0, 20, 20),
        ];
        let (labels, count) = partition(&rects, 0.2);
        assert_eq!(count, 1);
        assert_eq!(labels, vec![0, 0, 0]);
    }
}
