use std::str::FromStr;

use super::formats::OutputFormat;

/// Rule for deriving an output filename from a source filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingConvention {
    #[default]
    Original,
    Prefix,
    Suffix,
}

impl FromStr for NamingConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "prefix" => Ok(Self::Prefix),
            "suffix" => Ok(Self::Suffix),
            other => Err(format!(
                "unknown naming convention {other:?}, expected original, prefix or suffix"
            )),
        }
    }
}

/// Derive the output filename for one exported image. The stem is the
/// source name up to its last `.` (the whole name when there is none); the
/// extension always comes from the output format, never from the source.
/// Distinct sources may collapse to the same output name, in which case the
/// later write overwrites the earlier one.
pub fn resolve_output_name(
    original_name: &str,
    convention: NamingConvention,
    token: &str,
    format: OutputFormat,
) -> String {
    let stem = match original_name.rfind('.') {
        Some(index) => &original_name[..index],
        None => original_name,
    };
    let ext = format.extension();
    match convention {
        NamingConvention::Prefix => format!("{token}{stem}.{ext}"),
        NamingConvention::Suffix => format!("{stem}{token}.{ext}"),
        NamingConvention::Original => format!("{stem}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_convention() {
        assert_eq!(
            resolve_output_name("photo.JPG", NamingConvention::Suffix, "_wm", OutputFormat::Png),
            "photo_wm.png"
        );
    }

    #[test]
    fn test_prefix_convention() {
        assert_eq!(
            resolve_output_name("photo.jpg", NamingConvention::Prefix, "wm_", OutputFormat::Jpeg),
            "wm_photo.jpeg"
        );
    }

    #[test]
    fn test_original_convention() {
        assert_eq!(
            resolve_output_name("photo.jpg", NamingConvention::Original, "", OutputFormat::Png),
            "photo.png"
        );
    }

    #[test]
    fn test_token_ignored_for_original() {
        assert_eq!(
            resolve_output_name("photo.jpg", NamingConvention::Original, "_wm", OutputFormat::Png),
            "photo.png"
        );
    }

    #[test]
    fn test_name_without_extension() {
        assert_eq!(
            resolve_output_name("photo", NamingConvention::Suffix, "_wm", OutputFormat::Jpeg),
            "photo_wm.jpeg"
        );
    }

    #[test]
    fn test_only_last_dot_splits() {
        assert_eq!(
            resolve_output_name(
                "vacation.day.1.png",
                NamingConvention::Original,
                "",
                OutputFormat::Png
            ),
            "vacation.day.1.png"
        );
    }

    #[test]
    fn test_parse_convention() {
        assert_eq!(
            "Suffix".parse::<NamingConvention>().unwrap(),
            NamingConvention::Suffix
        );
        assert!("sideways".parse::<NamingConvention>().is_err());
    }
}
