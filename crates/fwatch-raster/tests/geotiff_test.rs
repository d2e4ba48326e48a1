//! Integration tests for reading and rewriting GeoTIFF tiles on disk.

use fwatch_raster::{list_tiffs, GeoReference, Raster, RasterError, Samples};
use std::fs;
use std::fs::File;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::{PhotometricInterpretation, SampleFormat};

/// Three UInt16 bands under a grayscale photometric tag, as GDAL writes them.
struct MinIsBlack16x3;

impl colortype::ColorType for MinIsBlack16x3 {
    type Inner = u16;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[16, 16, 16];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint; 3];
}

fn georef() -> GeoReference {
    GeoReference {
        tiepoint: Some(vec![0.0, 0.0, 0.0, -60.0, -5.0, 0.0]),
        pixel_scale: Some(vec![0.25, 0.25, 0.0]),
        geo_keys: Some(vec![1, 1, 0, 1, 2048, 0, 1, 4326]),
        nodata: Some("0".to_string()),
        ..GeoReference::default()
    }
}

#[test]
fn test_recolor_keeps_georeference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("1.tif");

    let data: Vec<u8> = (0..4 * 4 * 3).map(|i| i as u8).collect();
    Raster::new(4, 4, 3, Samples::U8(data))
        .unwrap()
        .with_georeference(georef())
        .write_to_file(&path)
        .unwrap();

    let mut tile = Raster::from_file(&path).unwrap();
    assert_eq!(tile.dimensions(), (4, 4));
    assert_eq!(tile.bands(), 3);
    assert_eq!(tile.pixel(1, 0).unwrap(), vec![3.0, 4.0, 5.0]);

    tile.fill_bands(&[0, 0, 153]).unwrap();
    tile.write_to_file(&path).unwrap();

    let reread = Raster::from_file(&path).unwrap();
    assert_eq!(reread.georeference(), &georef());
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(reread.pixel(x, y).unwrap(), vec![0.0, 0.0, 153.0]);
        }
    }
}

#[test]
fn test_sixteen_bit_gray() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray16.tif");

    Raster::new(3, 2, 1, Samples::U16(vec![100, 200, 300, 400, 500, 60000]))
        .unwrap()
        .write_to_file(&path)
        .unwrap();

    let tile = Raster::from_file(&path).unwrap();
    assert!(tile.georeference().is_empty());
    assert_eq!(tile.samples(), &Samples::U16(vec![100, 200, 300, 400, 500, 60000]));
}

#[test]
fn test_three_band_min_is_black_u16() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene16.tif");

    let data: Vec<u16> = (0..2 * 2 * 3).map(|i| 1000 + i as u16).collect();
    let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
    encoder
        .write_image::<MinIsBlack16x3>(2, 2, &data)
        .unwrap();

    let mut tile = Raster::from_file(&path).unwrap();
    assert_eq!(tile.bands(), 3);
    assert_eq!(tile.pixel(1, 0).unwrap(), vec![1003.0, 1004.0, 1005.0]);

    tile.fill_bands(&[0, 0, 153]).unwrap();
    tile.write_to_file(&path).unwrap();
    let reread = Raster::from_file(&path).unwrap();
    assert_eq!(reread.samples(), &Samples::U16([0, 0, 153].repeat(4)));
}

#[test]
fn test_five_band_float_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.tif");

    let data: Vec<f32> = (0..3 * 5).map(|i| i as f32 * 0.5).collect();
    Raster::new(3, 1, 5, Samples::F32(data.clone()))
        .unwrap()
        .write_to_file(&path)
        .unwrap();

    let mut tile = Raster::from_file(&path).unwrap();
    assert_eq!(tile.bands(), 5);
    assert_eq!(tile.samples(), &Samples::F32(data));

    tile.fill_band(1, 48).unwrap();
    assert_eq!(tile.pixel(2, 0).unwrap(), vec![5.0, 48.0, 6.0, 6.5, 7.0]);
}

#[test]
fn test_signed_samples_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem.tif");

    Raster::new(2, 1, 1, Samples::I16(vec![-32768, 1200]))
        .unwrap()
        .write_to_file(&path)
        .unwrap();

    let tile = Raster::from_file(&path).unwrap();
    assert_eq!(tile.samples(), &Samples::I16(vec![-32768, 1200]));
}

#[test]
fn test_not_a_tiff() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.tif");
    fs::write(&path, b"not a tiff at all").unwrap();

    let err = Raster::from_file(&path).unwrap_err();
    assert!(matches!(err, RasterError::Tiff(_)));
}

#[test]
fn test_list_tiffs_filters_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["20.tif", "3.TIF", "notes.txt", "1.tif"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    fs::create_dir(dir.path().join("nested.tif")).unwrap();

    let names: Vec<String> = list_tiffs(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["1.tif", "20.tif", "3.TIF"]);
}
