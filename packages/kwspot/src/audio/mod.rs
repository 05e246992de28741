pub mod band_pass_filter;

pub use band_pass_filter::BandPassFilter;
