//! Single-band GeoTIFF rasters in EPSG:4326.
//!
//! Georeferencing comes from the ModelPixelScale and ModelTiepoint tags.
//! The GDAL nodata tag, when present, is folded into NaN on decode so
//! downstream code only has one nodata representation.

use std::io::Cursor;

use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

/// Decoded raster values, row-major with the northernmost row first.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub bounds: GeoBounds,
    pub values: Vec<f32>,
}

#[derive(Debug)]
pub enum RasterError {
    Tiff(String),
    MissingGeoreference(&'static str),
    UnsupportedSampleFormat,
    SizeMismatch { expected: usize, got: usize },
    Encode(String),
}

impl std::fmt::Display for RasterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterError::Tiff(msg) => write!(f, "TIFF decode error: {msg}"),
            RasterError::MissingGeoreference(tag) => write!(f, "missing GeoTIFF tag {tag}"),
            RasterError::UnsupportedSampleFormat => write!(f, "unsupported sample format"),
            RasterError::SizeMismatch { expected, got } => {
                write!(f, "raster size mismatch (expected {expected} values, got {got})")
            }
            RasterError::Encode(msg) => write!(f, "TIFF encode error: {msg}"),
        }
    }
}

impl std::error::Error for RasterError {}

impl From<tiff::TiffError> for RasterError {
    fn from(e: tiff::TiffError) -> Self {
        RasterError::Tiff(e.to_string())
    }
}

impl DecodedRaster {
    pub fn new(
        width: u32,
        height: u32,
        bounds: GeoBounds,
        values: Vec<f32>,
    ) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bounds,
            values,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.values.len()
    }

    /// Value of the pixel covering `p`, `None` outside the raster or on nodata.
    pub fn sample(&self, p: LatLng) -> Option<f32> {
        if !self.bounds.contains(p) || self.width == 0 || self.height == 0 {
            return None;
        }
        let fx = (p.lng - self.bounds.west) / self.bounds.width();
        let fy = (self.bounds.north - p.lat) / self.bounds.height();
        let col = ((fx * self.width as f64) as u32).min(self.width - 1);
        let row = ((fy * self.height as f64) as u32).min(self.height - 1);
        let v = self.values[(row * self.width + col) as usize];
        v.is_finite().then_some(v)
    }

    /// Finite values only.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied().filter(|v| v.is_finite())
    }
}

pub fn decode_geotiff(bytes: &[u8]) -> Result<DecodedRaster, RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| RasterError::MissingGeoreference("ModelPixelScale"))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| RasterError::MissingGeoreference("ModelTiepoint"))?;
    if scale.len() < 2 {
        return Err(RasterError::MissingGeoreference("ModelPixelScale"));
    }
    if tiepoint.len() < 6 {
        return Err(RasterError::MissingGeoreference("ModelTiepoint"));
    }
    let nodata = read_nodata(&mut decoder);

    // Tiepoint maps raster (i, j) to model (x, y).
    let (sx, sy) = (scale[0], scale[1]);
    let west = tiepoint[3] - tiepoint[0] * sx;
    let north = tiepoint[4] + tiepoint[1] * sy;
    let bounds = GeoBounds::new(
        west,
        north - height as f64 * sy,
        west + width as f64 * sx,
        north,
    );

    let samples = to_f32(decoder.read_image()?)?;
    let pixels = width as usize * height as usize;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(RasterError::SizeMismatch {
            expected: pixels,
            got: samples.len(),
        });
    }
    // Multi-band files keep only the first band.
    let stride = samples.len() / pixels;
    let values = samples
        .into_iter()
        .step_by(stride)
        .map(|v| match nodata {
            Some(nd) if (v as f64 - nd).abs() < 1e-6 => f32::NAN,
            _ => v,
        })
        .collect();

    DecodedRaster::new(width, height, bounds, values)
}

fn read_nodata(decoder: &mut Decoder<Cursor<&[u8]>>) -> Option<f64> {
    let value = decoder.find_tag(Tag::GdalNodata).ok().flatten()?;
    let text = value.into_string().ok()?;
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn to_f32(image: DecodingResult) -> Result<Vec<f32>, RasterError> {
    let out = match image {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return Err(RasterError::UnsupportedSampleFormat),
    };
    Ok(out)
}

/// Writes a single-band float32 GeoTIFF with NaN as the nodata value.
pub fn encode_geotiff(raster: &DecodedRaster) -> Result<Vec<u8>, RasterError> {
    let enc_err = |e: tiff::TiffError| RasterError::Encode(e.to_string());
    let sx = raster.bounds.width() / raster.width.max(1) as f64;
    let sy = raster.bounds.height() / raster.height.max(1) as f64;

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).map_err(enc_err)?;
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(raster.width, raster.height)
            .map_err(enc_err)?;
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[sx, sy, 0.0][..])
            .map_err(enc_err)?;
        image
            .encoder()
            .write_tag(
                Tag::ModelTiepointTag,
                &[0.0, 0.0, 0.0, raster.bounds.west, raster.bounds.north, 0.0][..],
            )
            .map_err(enc_err)?;
        image
            .encoder()
            .write_tag(Tag::GdalNodata, "nan")
            .map_err(enc_err)?;
        image.write_data(&raster.values).map_err(enc_err)?;
    }
    Ok(buf.into_inner())
}
