//! Multi-band raster loaded from (and written back to) a GeoTIFF file.

use crate::{RasterError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder, TiffValue};
use tiff::tags::{PhotometricInterpretation, PlanarConfiguration, SampleFormat, Tag};

/// GeoTIFF ModelPixelScale tag.
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GeoTIFF ModelTiepoint tag.
const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GeoTIFF ModelTransformation tag.
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
/// GeoTIFF GeoKeyDirectory tag.
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
/// GeoTIFF GeoDoubleParams tag.
const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
/// GeoTIFF GeoAsciiParams tag.
const TAG_GEO_ASCII_PARAMS: u16 = 34737;
/// GDAL_NODATA tag, stored as an ASCII string.
const TAG_GDAL_NODATA: u16 = 42113;

/// Most bands a raster may carry.
pub const MAX_BANDS: usize = 8;

/// Pixel-interleaved sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// 8-bit unsigned samples (GDAL Byte).
    U8(Vec<u8>),
    /// 16-bit unsigned samples (GDAL UInt16).
    U16(Vec<u16>),
    /// 16-bit signed samples (GDAL Int16).
    I16(Vec<i16>),
    /// 32-bit float samples (GDAL Float32).
    F32(Vec<f32>),
}

impl Samples {
    /// Number of samples in the buffer.
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(data) => data.len(),
            Samples::U16(data) => data.len(),
            Samples::I16(data) => data.len(),
            Samples::F32(data) => data.len(),
        }
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one sample widened to `f64`.
    fn get(&self, idx: usize) -> f64 {
        match self {
            Samples::U8(data) => f64::from(data[idx]),
            Samples::U16(data) => f64::from(data[idx]),
            Samples::I16(data) => f64::from(data[idx]),
            Samples::F32(data) => f64::from(data[idx]),
        }
    }
}

/// Georeferencing tags carried over verbatim from the source file.
///
/// The values are never interpreted; they are kept so that a recolored
/// raster stays aligned with the tile it was cut from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    /// ModelTiepoint: `[i, j, k, x, y, z]` tuples.
    pub tiepoint: Option<Vec<f64>>,
    /// ModelPixelScale: `[sx, sy, sz]`.
    pub pixel_scale: Option<Vec<f64>>,
    /// ModelTransformation: 4x4 affine matrix.
    pub transformation: Option<Vec<f64>>,
    /// GeoKeyDirectory.
    pub geo_keys: Option<Vec<u16>>,
    /// GeoDoubleParams.
    pub geo_doubles: Option<Vec<f64>>,
    /// GeoAsciiParams.
    pub geo_ascii: Option<String>,
    /// GDAL no-data value.
    pub nodata: Option<String>,
}

impl GeoReference {
    /// Read whichever georeferencing tags are present.
    fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Self {
        Self {
            tiepoint: decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT)).ok(),
            pixel_scale: decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE)).ok(),
            transformation: decoder
                .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION))
                .ok(),
            geo_keys: decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY)).ok(),
            geo_doubles: decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_GEO_DOUBLE_PARAMS)).ok(),
            geo_ascii: decoder
                .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GEO_ASCII_PARAMS))
                .ok(),
            nodata: decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA)).ok(),
        }
    }

    /// Whether no georeferencing tag was found.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A raster image with one or more bands of samples.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    bands: usize,
    samples: Samples,
    georef: GeoReference,
}

impl Raster {
    /// Build a raster from a pixel-interleaved sample buffer.
    pub fn new(width: u32, height: u32, bands: usize, samples: Samples) -> Result<Self> {
        if !(1..=MAX_BANDS).contains(&bands) {
            return Err(RasterError::UnsupportedLayout(format!("{} bands", bands)));
        }
        let expected = width as usize * height as usize * bands;
        if samples.len() != expected {
            return Err(RasterError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            samples,
            georef: GeoReference::default(),
        })
    }

    /// Attach georeferencing tags.
    pub fn with_georeference(mut self, georef: GeoReference) -> Self {
        self.georef = georef;
        self
    }

    /// Load a raster from a GeoTIFF file.
    ///
    /// The band count comes from SamplesPerPixel. Layouts the decoder has no
    /// color type for (e.g. three UInt16 bands tagged grayscale) are read
    /// straight from their strips when those are uncompressed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        // Source scenes can be large; lift the default decoder limits.
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let bands = usize::from(
            decoder
                .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
                .unwrap_or(1),
        );
        let planar = decoder
            .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)?
            .and_then(PlanarConfiguration::from_u16)
            .unwrap_or(PlanarConfiguration::Chunky);
        if bands > 1 && planar == PlanarConfiguration::Planar {
            return Err(RasterError::UnsupportedLayout(format!(
                "{} bands in separate planes",
                bands
            )));
        }

        let georef = GeoReference::read(&mut decoder);

        let samples = if decoder.colortype().is_ok() {
            match decoder.read_image()? {
                DecodingResult::U8(data) => Samples::U8(data),
                DecodingResult::U16(data) => Samples::U16(data),
                DecodingResult::I16(data) => Samples::I16(data),
                DecodingResult::F32(data) => Samples::F32(data),
                _ => return Err(RasterError::UnsupportedSampleType(sample_layout(&mut decoder)?)),
            }
        } else {
            read_plain_strips(&mut decoder, path, width as usize * height as usize * bands)?
        };

        Ok(Self::new(width, height, bands, samples)?.with_georeference(georef))
    }

    /// Write the raster as an uncompressed GeoTIFF, replacing any existing file.
    ///
    /// Three and four band rasters are tagged RGB; every other band count
    /// is tagged grayscale with interleaved extra samples.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;

        match &self.samples {
            Samples::U8(data) => self.encode_bands(&mut encoder, data),
            Samples::U16(data) => self.encode_bands(&mut encoder, data),
            Samples::I16(data) => self.encode_bands(&mut encoder, data),
            Samples::F32(data) => self.encode_bands(&mut encoder, data),
        }
    }

    /// Pick the interleaved color type matching this raster's band count.
    fn encode_bands<S, W>(&self, encoder: &mut TiffEncoder<W>, data: &[S]) -> Result<()>
    where
        S: BandSample,
        W: Write + Seek,
        [S]: TiffValue,
    {
        let (w, h, g) = (self.width, self.height, &self.georef);
        match self.bands {
            1 => encode::<Interleaved<S, 1>, _>(encoder, w, h, g, data),
            2 => encode::<Interleaved<S, 2>, _>(encoder, w, h, g, data),
            3 => encode::<Interleaved<S, 3>, _>(encoder, w, h, g, data),
            4 => encode::<Interleaved<S, 4>, _>(encoder, w, h, g, data),
            5 => encode::<Interleaved<S, 5>, _>(encoder, w, h, g, data),
            6 => encode::<Interleaved<S, 6>, _>(encoder, w, h, g, data),
            7 => encode::<Interleaved<S, 7>, _>(encoder, w, h, g, data),
            8 => encode::<Interleaved<S, 8>, _>(encoder, w, h, g, data),
            bands => Err(RasterError::UnsupportedLayout(format!("{} bands", bands))),
        }
    }

    /// Overwrite every pixel of one band with `value`.
    ///
    /// Values above the sample type's maximum saturate.
    pub fn fill_band(&mut self, band: usize, value: u16) -> Result<()> {
        if band >= self.bands {
            return Err(RasterError::BandOutOfRange {
                band,
                bands: self.bands,
            });
        }
        let bands = self.bands;
        match &mut self.samples {
            Samples::U8(data) => {
                let v = u8::try_from(value).unwrap_or(u8::MAX);
                data.iter_mut().skip(band).step_by(bands).for_each(|s| *s = v);
            }
            Samples::U16(data) => {
                data.iter_mut().skip(band).step_by(bands).for_each(|s| *s = value);
            }
            Samples::I16(data) => {
                let v = i16::try_from(value).unwrap_or(i16::MAX);
                data.iter_mut().skip(band).step_by(bands).for_each(|s| *s = v);
            }
            Samples::F32(data) => {
                let v = f32::from(value);
                data.iter_mut().skip(band).step_by(bands).for_each(|s| *s = v);
            }
        }
        Ok(())
    }

    /// Overwrite the leading bands with one flat value each.
    ///
    /// `values[i]` goes to band `i`; bands past `values.len()` are untouched.
    pub fn fill_bands(&mut self, values: &[u16]) -> Result<()> {
        if values.len() > self.bands {
            return Err(RasterError::TooFewBands {
                required: values.len(),
                available: self.bands,
            });
        }
        for (band, &value) in values.iter().enumerate() {
            self.fill_band(band, value)?;
        }
        Ok(())
    }

    /// Sample values of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec<f64>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.bands;
        Some((start..start + self.bands).map(|i| self.samples.get(i)).collect())
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of bands.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// The sample buffer.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Georeferencing tags.
    pub fn georeference(&self) -> &GeoReference {
        &self.georef
    }
}

/// Bits and sample format of every band, for error messages.
fn sample_layout<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<String> {
    let bits = decoder
        .find_tag_unsigned_vec::<u16>(Tag::BitsPerSample)?
        .unwrap_or_default();
    let format = decoder
        .find_tag_unsigned_vec::<u16>(Tag::SampleFormat)?
        .unwrap_or_default();
    Ok(format!("bits {:?}, format {:?}", bits, format))
}

/// Read uncompressed, pixel-interleaved strips without going through a color type.
fn read_plain_strips<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path, count: usize) -> Result<Samples> {
    let compression = decoder.find_tag_unsigned::<u16>(Tag::Compression)?.unwrap_or(1);
    let offsets = decoder.find_tag_unsigned_vec::<u64>(Tag::StripOffsets)?;
    let byte_counts = decoder.find_tag_unsigned_vec::<u64>(Tag::StripByteCounts)?;
    let (offsets, byte_counts) = match (compression, offsets, byte_counts) {
        (1, Some(offsets), Some(counts)) if offsets.len() == counts.len() => (offsets, counts),
        _ => {
            return Err(RasterError::UnsupportedLayout(format!(
                "{} (compression {})",
                sample_layout(decoder)?,
                compression
            )))
        }
    };

    let bits = decoder
        .find_tag_unsigned_vec::<u16>(Tag::BitsPerSample)?
        .unwrap_or_else(|| vec![1]);
    let format = decoder
        .find_tag_unsigned_vec::<u16>(Tag::SampleFormat)?
        .and_then(|f| f.first().copied())
        .and_then(SampleFormat::from_u16)
        .unwrap_or(SampleFormat::Uint);
    if bits.windows(2).any(|w| w[0] != w[1]) {
        return Err(RasterError::UnsupportedSampleType(sample_layout(decoder)?));
    }
    let width = match (bits.first().copied().unwrap_or(1), format) {
        (8, SampleFormat::Uint) => 1,
        (16, SampleFormat::Uint) | (16, SampleFormat::Int) => 2,
        (32, SampleFormat::IEEEFP) => 4,
        _ => return Err(RasterError::UnsupportedSampleType(sample_layout(decoder)?)),
    };

    let mut file = BufReader::new(File::open(path)?);
    let mut header = [0u8; 2];
    file.read_exact(&mut header)?;
    let big_endian = &header == b"MM";

    let needed = count * width;
    let mut bytes = Vec::with_capacity(needed);
    for (&offset, &len) in offsets.iter().zip(&byte_counts) {
        if bytes.len() >= needed {
            break;
        }
        let len = usize::try_from(len).unwrap_or(usize::MAX).min(needed - bytes.len());
        let start = bytes.len();
        bytes.resize(start + len, 0);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut bytes[start..])?;
    }
    if bytes.len() < needed {
        return Err(RasterError::SampleCount {
            expected: count,
            actual: bytes.len() / width,
        });
    }

    let samples = match (width, format) {
        (1, _) => Samples::U8(bytes),
        (2, SampleFormat::Int) => Samples::I16(
            bytes
                .chunks_exact(2)
                .map(|b| {
                    let b = [b[0], b[1]];
                    if big_endian { i16::from_be_bytes(b) } else { i16::from_le_bytes(b) }
                })
                .collect(),
        ),
        (2, _) => Samples::U16(
            bytes
                .chunks_exact(2)
                .map(|b| {
                    let b = [b[0], b[1]];
                    if big_endian { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) }
                })
                .collect(),
        ),
        _ => Samples::F32(
            bytes
                .chunks_exact(4)
                .map(|b| {
                    let b = [b[0], b[1], b[2], b[3]];
                    if big_endian { f32::from_be_bytes(b) } else { f32::from_le_bytes(b) }
                })
                .collect(),
        ),
    };
    Ok(samples)
}

/// Sample types the encoder writes.
trait BandSample: TiffValue + Copy {
    const BITS: u16;
    const FORMAT: SampleFormat;
}

impl BandSample for u8 {
    const BITS: u16 = 8;
    const FORMAT: SampleFormat = SampleFormat::Uint;
}

impl BandSample for u16 {
    const BITS: u16 = 16;
    const FORMAT: SampleFormat = SampleFormat::Uint;
}

impl BandSample for i16 {
    const BITS: u16 = 16;
    const FORMAT: SampleFormat = SampleFormat::Int;
}

impl BandSample for f32 {
    const BITS: u16 = 32;
    const FORMAT: SampleFormat = SampleFormat::IEEEFP;
}

/// `N` interleaved samples of type `S` per pixel.
struct Interleaved<S, const N: usize>(PhantomData<S>);

impl<S: BandSample, const N: usize> colortype::ColorType for Interleaved<S, N> {
    type Inner = S;
    const TIFF_VALUE: PhotometricInterpretation = if N == 3 || N == 4 {
        PhotometricInterpretation::RGB
    } else {
        PhotometricInterpretation::BlackIsZero
    };
    const BITS_PER_SAMPLE: &'static [u16] = &[S::BITS; N];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[S::FORMAT; N];
}

/// Encode one image with the given color type, copying georeferencing tags.
fn encode<C, W>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    georef: &GeoReference,
    data: &[C::Inner],
) -> Result<()>
where
    C: colortype::ColorType,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image::<C>(width, height)?;
    {
        let dir = image.encoder();
        if let Some(v) = &georef.pixel_scale {
            dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &v[..])?;
        }
        if let Some(v) = &georef.tiepoint {
            dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &v[..])?;
        }
        if let Some(v) = &georef.transformation {
            dir.write_tag(Tag::Unknown(TAG_MODEL_TRANSFORMATION), &v[..])?;
        }
        if let Some(v) = &georef.geo_keys {
            dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &v[..])?;
        }
        if let Some(v) = &georef.geo_doubles {
            dir.write_tag(Tag::Unknown(TAG_GEO_DOUBLE_PARAMS), &v[..])?;
        }
        if let Some(v) = &georef.geo_ascii {
            dir.write_tag(Tag::Unknown(TAG_GEO_ASCII_PARAMS), v.as_str())?;
        }
        if let Some(v) = &georef.nodata {
            dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), v.as_str())?;
        }
    }
    image.write_data(data)?;
    Ok(())
}
