//! Line-oriented diff.
//!
//! Minimal edit scripts via Myers' O((N+M)D) algorithm over `'\n'`-split
//! lines. Common prefix and suffix are trimmed before the search.

use std::fmt::Write;

/// Kind of a diff line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOp {
    Context,
    Add,
    Remove,
}

/// One line of an edit script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiffLine<'a> {
    pub op: LineOp,
    pub text: &'a str,
}

/// Added/removed line counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStats {
    /// Lines marked `+` or `-` in the unified form.
    pub fn changed(&self) -> usize {
        self.additions + self.deletions
    }
}

/// Split text into lines the way the filter counts them.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Count added and removed lines between two texts.
pub fn stats(old: &str, new: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    for line in diff_lines(old, new) {
        match line.op {
            LineOp::Add => stats.additions += 1,
            LineOp::Remove => stats.deletions += 1,
            LineOp::Context => {}
        }
    }
    stats
}

/// Minimal edit script turning `old` into `new`.
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> Vec<DiffLine<'a>> {
    let a = split_lines(old);
    let b = split_lines(new);

    let prefix = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    out.extend(a[..prefix].iter().map(|t| DiffLine {
        op: LineOp::Context,
        text: t,
    }));
    out.extend(myers(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
    ));
    out.extend(a[a.len() - suffix..].iter().map(|t| DiffLine {
        op: LineOp::Context,
        text: t,
    }));
    out
}

fn myers<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<DiffLine<'a>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let offset = max + 1;
    let idx = |k: isize| (k + offset) as usize;

    let mut v = vec![0isize; (2 * max + 3) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the trace backwards to recover the script.
    let mut script = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            script.push(DiffLine {
                op: LineOp::Context,
                text: a[(x - 1) as usize],
            });
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                script.push(DiffLine {
                    op: LineOp::Add,
                    text: b[(y - 1) as usize],
                });
            } else {
                script.push(DiffLine {
                    op: LineOp::Remove,
                    text: a[(x - 1) as usize],
                });
            }
        }
        x = prev_x;
        y = prev_y;
    }
    script.reverse();
    script
}

/// Render a unified diff with `context` lines around each hunk.
///
/// Always starts with the `---`/`+++` header pair; identical inputs
/// produce only the header.
pub fn unified(old: &str, new: &str, context: usize) -> String {
    let lines = diff_lines(old, new);
    let mut out = String::from("--- previous\n+++ current\n");

    let changes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.op != LineOp::Context)
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return out;
    }

    // Line numbers (0-based) in old/new before each script position.
    let mut old_before = Vec::with_capacity(lines.len());
    let mut new_before = Vec::with_capacity(lines.len());
    let (mut o, mut n) = (0usize, 0usize);
    for line in &lines {
        old_before.push(o);
        new_before.push(n);
        if line.op != LineOp::Add {
            o += 1;
        }
        if line.op != LineOp::Remove {
            n += 1;
        }
    }

    let mut i = 0;
    while i < changes.len() {
        let start = changes[i].saturating_sub(context);
        let mut last = changes[i];
        while i + 1 < changes.len() && changes[i + 1] - last - 1 <= 2 * context {
            i += 1;
            last = changes[i];
        }
        let end = (last + context).min(lines.len() - 1);
        i += 1;

        let hunk = &lines[start..=end];
        let old_len = hunk.iter().filter(|l| l.op != LineOp::Add).count();
        let new_len = hunk.iter().filter(|l| l.op != LineOp::Remove).count();
        let old_start = if old_len == 0 { old_before[start] } else { old_before[start] + 1 };
        let new_start = if new_len == 0 { new_before[start] } else { new_before[start] + 1 };

        let _ = writeln!(out, "@@ -{},{} +{},{} @@", old_start, old_len, new_start, new_len);
        for line in hunk {
            let marker = match line.op {
                LineOp::Context => ' ',
                LineOp::Add => '+',
                LineOp::Remove => '-',
            };
            let _ = writeln!(out, "{}{}", marker, line.text);
        }
    }
    out
}
