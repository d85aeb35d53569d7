//! GPS geotag extraction from EXIF metadata.
//!
//! Extraction never fails: a missing, unreadable or malformed GPS block is a
//! normal outcome and resolves to `GeoTag { has_gps: false }`.

use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::types::GeoTag;

/// Hemisphere reference from `GPSLatitudeRef` / `GPSLongitudeRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Parse the single-letter EXIF reference (`N`, `S`, `E`, `W`).
    pub fn from_ref(reference: &[u8]) -> Option<Self> {
        match reference.first().map(u8::to_ascii_uppercase) {
            Some(b'N') => Some(Self::North),
            Some(b'S') => Some(Self::South),
            Some(b'E') => Some(Self::East),
            Some(b'W') => Some(Self::West),
            _ => None,
        }
    }

    fn sign(self) -> f64 {
        match self {
            Self::South | Self::West => -1.0,
            Self::North | Self::East => 1.0,
        }
    }
}

/// Convert degrees/minutes/seconds to signed decimal degrees.
///
/// A missing hemisphere leaves the value positive.
pub fn dms_to_decimal(
    degrees: f64,
    minutes: f64,
    seconds: f64,
    hemisphere: Option<Hemisphere>,
) -> f64 {
    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    hemisphere.map_or(magnitude, |h| h.sign() * magnitude)
}

/// Reads GPS coordinates out of image files.
pub struct GeoTagExtractor;

impl GeoTagExtractor {
    /// Extract the geotag of the image at `path`.
    pub fn extract(path: &Path) -> GeoTag {
        match Self::read_exif(path) {
            Some(exif) => Self::from_exif(&exif),
            None => GeoTag::absent(),
        }
    }

    /// Build a geotag from already-parsed EXIF data.
    ///
    /// Both coordinates must be present and in range.
    pub fn from_exif(exif: &Exif) -> GeoTag {
        let latitude = Self::coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
        let longitude = Self::coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);

        match (latitude, longitude) {
            (Some(lat), Some(lon)) if lat.abs() <= 90.0 && lon.abs() <= 180.0 => {
                GeoTag::at(lat, lon)
            }
            (Some(lat), Some(lon)) => {
                tracing::debug!("Ignoring out-of-range GPS coordinates ({lat}, {lon})");
                GeoTag::absent()
            }
            _ => GeoTag::absent(),
        }
    }

    fn read_exif(path: &Path) -> Option<Exif> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Some(exif),
            Err(e) => {
                tracing::trace!("No EXIF in {:?}: {}", path, e);
                None
            }
        }
    }

    fn coordinate(exif: &Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let [d, m, s] = Self::dms_components(&coord.value)?;
        let hemisphere = exif
            .get_field(ref_tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Ascii(parts) => parts.first().and_then(|r| Hemisphere::from_ref(r)),
                _ => None,
            });

        let decimal = dms_to_decimal(d, m, s, hemisphere);
        decimal.is_finite().then_some(decimal)
    }

    /// Degrees, minutes and seconds from a rational triple.
    fn dms_components(value: &Value) -> Option<[f64; 3]> {
        let parts: Vec<f64> = match value {
            Value::Rational(v) => v.iter().map(|r| r.to_f64()).collect(),
            Value::SRational(v) => v.iter().map(|r| r.to_f64()).collect(),
            _ => return None,
        };
        match parts.as_slice() {
            [d, m, s, ..] if [d, m, s].iter().all(|x| x.is_finite()) => Some([*d, *m, *s]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn rationals(dms: [(u32, u32); 3]) -> Value {
        Value::Rational(
            dms.iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        )
    }

    fn ascii(s: &str) -> Value {
        Value::Ascii(vec![s.as_bytes().to_vec()])
    }

    /// Write a small JPEG whose APP1 segment carries the given EXIF fields.
    fn jpeg_with_fields(dir: &Path, fields: &[Field]) -> PathBuf {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();
        let tiff = tiff.into_inner();

        let mut encoded = Vec::new();
        image::DynamicImage::ImageRgb8(RgbImage::new(16, 16))
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
            .unwrap();

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend(((2 + 6 + tiff.len()) as u16).to_be_bytes());
        jpeg.extend(b"Exif\0\0");
        jpeg.extend(&tiff);
        jpeg.extend(&encoded[2..]);

        let path = dir.join("geotagged.jpg");
        std::fs::write(&path, jpeg).unwrap();
        path
    }

    fn gps_fields(lat_ref: &str, lon_ref: &str) -> Vec<Field> {
        vec![
            Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: ascii(lat_ref),
            },
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: rationals([(10, 1), (30, 1), (0, 1)]),
            },
            Field {
                tag: Tag::GPSLongitudeRef,
                ifd_num: In::PRIMARY,
                value: ascii(lon_ref),
            },
            Field {
                tag: Tag::GPSLongitude,
                ifd_num: In::PRIMARY,
                value: rationals([(39, 1), (15, 1), (1800, 100)]),
            },
        ]
    }

    #[test]
    fn test_dms_south_is_negative() {
        let lat = dms_to_decimal(10.0, 30.0, 0.0, Some(Hemisphere::South));
        assert!((lat - (-10.5)).abs() < 1e-12);
    }

    #[test]
    fn test_dms_west_is_negative_and_east_positive() {
        let west = dms_to_decimal(122.0, 15.0, 36.0, Some(Hemisphere::West));
        assert!((west - (-122.26)).abs() < 1e-9);
        let east = dms_to_decimal(122.0, 15.0, 36.0, Some(Hemisphere::East));
        assert!((east - 122.26).abs() < 1e-9);
    }

    #[test]
    fn test_dms_without_reference_stays_positive() {
        assert!((dms_to_decimal(1.0, 30.0, 0.0, None) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_hemisphere_from_ref() {
        assert_eq!(Hemisphere::from_ref(b"S"), Some(Hemisphere::South));
        assert_eq!(Hemisphere::from_ref(b"w"), Some(Hemisphere::West));
        assert_eq!(Hemisphere::from_ref(b""), None);
        assert_eq!(Hemisphere::from_ref(b"X"), None);
    }

    #[test]
    fn test_extract_missing_file() {
        let tag = GeoTagExtractor::extract(Path::new("/nonexistent/file.jpg"));
        assert_eq!(tag, GeoTag::absent());
    }

    #[test]
    fn test_extract_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.jpg");
        std::fs::write(&path, b"\xFF\xD8\xFFnot really a jpeg").unwrap();
        assert!(!GeoTagExtractor::extract(&path).has_gps);
    }

    #[test]
    fn test_extract_image_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        RgbImage::new(8, 8).save(&path).unwrap();
        assert!(!GeoTagExtractor::extract(&path).has_gps);
    }

    #[test]
    fn test_extract_southern_western_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = jpeg_with_fields(dir.path(), &gps_fields("S", "W"));
        let tag = GeoTagExtractor::extract(&path);
        assert!(tag.has_gps);
        assert!((tag.latitude.unwrap() - (-10.5)).abs() < 1e-9);
        assert!((tag.longitude.unwrap() - (-39.255)).abs() < 1e-9);
    }

    #[test]
    fn test_extract_requires_both_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let fields: Vec<Field> = gps_fields("N", "E").into_iter().take(2).collect();
        let path = jpeg_with_fields(dir.path(), &fields);
        assert_eq!(GeoTagExtractor::extract(&path), GeoTag::absent());
    }
}
