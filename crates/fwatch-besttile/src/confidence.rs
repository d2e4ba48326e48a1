//! Visual encodings of crowd agreement.
//!
//! Two independent encodings of the same signal are produced for every
//! selected tile:
//!
//! - **heat**: bands 1-3 painted with one flat color from a 12-step ramp
//!   chosen by the agreement ratio (reds for weak agreement, blues for strong)
//! - **intensity**: band 2 set to the winning vote count x 8, all other bands 0

use crate::tally::Selection;
use fwatch_raster::{Raster, Result};

/// Scale applied to the winning vote count in the intensity encoding.
pub const INTENSITY_SCALE: u32 = 8;

/// Agreement interval a ratio falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementBand {
    /// Exactly 0.0 (no counted votes).
    None,
    /// `[n/10, (n+1)/10)` for n in 0..=9, with decile 0 excluding 0.0 itself.
    Decile(u8),
    /// Exactly 1.0.
    Unanimous,
}

impl AgreementBand {
    /// Band for an agreement ratio.
    ///
    /// Ratios below 0.0 fall into [`AgreementBand::None`] and ratios above
    /// 1.0 into [`AgreementBand::Unanimous`]; selection never produces either.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.0 || ratio.is_nan() {
            return AgreementBand::None;
        }
        if ratio >= 1.0 {
            return AgreementBand::Unanimous;
        }
        // Compare against n/10 so boundaries like 0.3 land where a decimal
        // reading puts them.
        let decile = (1..10u8)
            .rev()
            .find(|&n| ratio >= f64::from(n) / 10.0)
            .unwrap_or(0);
        AgreementBand::Decile(decile)
    }

    /// Heat ramp color.
    pub fn color(self) -> [u8; 3] {
        match self {
            AgreementBand::None => [255, 0, 0],
            AgreementBand::Decile(0) => [229, 0, 0],
            AgreementBand::Decile(1) => [204, 0, 0],
            AgreementBand::Decile(2) => [178, 0, 0],
            AgreementBand::Decile(3) => [153, 0, 0],
            AgreementBand::Decile(4) => [127, 0, 0],
            AgreementBand::Decile(5) => [0, 0, 127],
            AgreementBand::Decile(6) => [0, 0, 153],
            AgreementBand::Decile(7) => [0, 0, 178],
            AgreementBand::Decile(8) => [0, 0, 204],
            AgreementBand::Decile(_) => [0, 0, 229],
            AgreementBand::Unanimous => [0, 0, 225],
        }
    }
}

/// Paint the heat encoding for `selection` onto `raster`.
pub fn paint_heat(raster: &mut Raster, selection: &Selection) -> Result<()> {
    let [r, g, b] = AgreementBand::from_ratio(selection.agreement_ratio()).color();
    raster.fill_bands(&[r.into(), g.into(), b.into()])
}

/// Paint the intensity encoding for `selection` onto `raster`.
pub fn paint_intensity(raster: &mut Raster, selection: &Selection) -> Result<()> {
    let value = selection.winning_count.saturating_mul(INTENSITY_SCALE);
    let value = u16::try_from(value).unwrap_or(u16::MAX);
    for band in 0..raster.bands() {
        raster.fill_band(band, if band == 1 { value } else { 0 })?;
    }
    Ok(())
}
