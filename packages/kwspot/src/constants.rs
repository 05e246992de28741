//! Core compile-time constants for kwspot.
//!
//!  * All values are `pub` unless they’re strictly an implementation detail
//!    (then they stay `pub(crate)`).
//!  * “Magic numbers” are grouped logically with doc comments.
//!  * These are the defaults baked into [`ModelParams::default`]; a loaded
//!    model file may override any of them.
//!
//! [`ModelParams::default`]: crate::model::ModelParams

/* --------------------------------------------------------------------- */
/*  Global sample-rate & frame layout                                    */

/// Internal mono PCM sample-rate (Hz).
pub const DETECTOR_INTERNAL_SAMPLE_RATE: usize = 16_000;

/// Samples per `process` call (32 ms @ 16 kHz).
pub const DEFAULT_FRAME_LENGTH: usize = 512;

/// Samples per analysis window. Anything above the frame length is carried
/// over from previous frames.
pub const DEFAULT_WINDOW_LENGTH: usize = 512;

/// Longest analysis window a model may request.
pub const MAX_WINDOW_LENGTH: usize = 1 << 16;

/* --------------------------------------------------------------------- */
/*  KFC front-end                                                         */

/// Triangular mel filters in the filter bank.
pub const KFC_MEL_BINS: usize = 40;

/// Upper bound on the mel filter count of a loaded model.
pub const MAX_MEL_BINS: usize = 256;

/// Cepstral coefficients kept per frame (c0 is dropped).
pub const KFC_COEFFS: usize = 13;

/// Lower edge of the mel filter bank (Hz).
pub const KFC_LOW_FREQ: f32 = 60.0;

/// Upper edge of the mel filter bank (Hz).
pub const KFC_HIGH_FREQ: f32 = 7_600.0;

/// Pre-emphasis coefficient (first-order high-pass).
pub const PRE_EMPHASIS: f32 = 0.97;

/// Frames whose energy falls below this level (dBFS) are flagged silent.
pub const SILENCE_FLOOR_DB: f32 = -60.0;

/// Dynamic range kept in each frame's mel energies: bins more than this far
/// below the frame's strongest bin are raised to that level.
pub const MEL_DYNAMIC_RANGE_DB: f32 = 30.0;

/// Floor added before taking logarithms of spectral energies.
pub(crate) const LOG_FLOOR: f32 = 1e-10;

/* --------------------------------------------------------------------- */
/*  Dynamic-time-warping scorer defaults                                  */

/// Sakoe-Chiba band half-width (frames) for the streaming alignment.
pub const COMPARATOR_DEFAULT_BAND_SIZE: u16 = 5;

/// Extra cost charged for every non-diagonal alignment step.
pub const COMPARATOR_DEFAULT_STEP_PENALTY: f32 = 0.1;

/// Reference cost that maps to the logistic mid-point.
pub const DETECTOR_DEFAULT_REFERENCE: f32 = 0.22;

/* --------------------------------------------------------------------- */
/*  Decision defaults                                                     */

/// Threshold applied at sensitivity `0.0` (strictest).
pub const DETECTOR_THRESHOLD_STRICT: f32 = 0.70;

/// Threshold applied at sensitivity `1.0` (most lenient).
pub const DETECTOR_THRESHOLD_LENIENT: f32 = 0.40;

/// Consecutive above-threshold frames before a candidate is accepted.
pub const DETECTOR_DEFAULT_MIN_SCORES: usize = 1;

/// Frames a candidate may stay pending while its score keeps climbing.
pub const DETECTOR_DEFAULT_MAX_PENDING: usize = 8;

/// Sensitivity used when none is configured.
pub const DEFAULT_SENSITIVITY: f32 = 0.5;

/* --------------------------------------------------------------------- */
/*  Keyword templates                                                     */

/// Voiced frames a reference template needs to be usable.
pub const MIN_TEMPLATE_VOICED_FRAMES: usize = 3;

/* --------------------------------------------------------------------- */
/*  File formats                                                          */

/// Format version for [`ModelParams`](crate::model::ModelParams).
/// Increment **whenever stored layout changes**.
pub const MODEL_FORMAT_VERSION: u8 = 1;

/// Format version for [`KeywordSpec`](crate::keyword::KeywordSpec).
pub const KEYWORD_FORMAT_VERSION: u8 = 1;
