//! Image and annotation folder listing.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::Result;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// File names of the images directly inside `folder`, in natural order.
pub fn list_images(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for ext in IMAGE_EXTENSIONS {
        names.extend(list_with_extension(folder, ext)?);
    }
    names.sort_by(|a, b| natural_cmp(a, b));
    names.dedup();
    Ok(names)
}

/// Base names (without `.json`) of the annotation files in `folder`, in natural order.
pub fn list_annotations(folder: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = list_with_extension(folder, "json")?
        .into_iter()
        .filter(|name| !name.starts_with('.'))
        .map(|name| base_name(&name))
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names)
}

fn list_with_extension(folder: &Path, ext: &str) -> Result<Vec<String>> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&folder.to_string_lossy()),
        ext
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    let names = glob::glob_with(&pattern, options)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    Ok(names)
}

/// File name without its last extension.
pub fn base_name(image_name: &str) -> String {
    Path::new(image_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| image_name.to_string())
}

/// Where the annotations of `image_name` live: `<json_folder>/<base name>.json`.
pub fn annotation_path(json_folder: &Path, image_name: &str) -> PathBuf {
    let file_name = Path::new(image_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| image_name.to_string());
    json_folder.join(format!("{}.json", base_name(&file_name)))
}

/// Natural ordering: runs of digits compare by value, everything else
/// case-insensitively. `img2` sorts before `img10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_chunks(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.bytes().all(|b| b.is_ascii_digit());
    let y_digits = y.bytes().all(|b| b.is_ascii_digit());
    if x_digits && y_digits {
        let x = x.trim_start_matches('0');
        let y = y.trim_start_matches('0');
        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
    } else {
        x.to_lowercase().cmp(&y.to_lowercase())
    }
}

/// Split into alternating digit / non-digit runs.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map_or(rest.len(), |(i, _)| i);
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}
