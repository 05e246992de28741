mod common;

use std::path::Path;

use common::*;
use hound::{SampleFormat, WavSpec, WavWriter};
use kwspot::{
    CborLoad, CborSave, KeywordSpec, KeywordSpotter,
    keyword::{BuilderError, build_from_wav_buffers, build_from_wav_files},
};

fn write_wav(path: &Path, channels: u16, rate: u32, pcm: &[i16]) {
    let spec = WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut w = WavWriter::create(path, spec).unwrap();
    for &s in pcm {
        for _ in 0..channels {
            w.write_sample(s).unwrap();
        }
    }
    w.finalize().unwrap();
}

fn padded_keyword(lead: usize, tail: usize) -> Vec<i16> {
    let mut pcm = silence(lead);
    pcm.extend(keyword_pcm());
    pcm.extend(silence(tail));
    pcm
}

#[test]
fn build_from_wav_files_and_detect() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let m = model();

    let paths: Vec<_> = [(1, 3, 2), (2, 5, 1), (1, 1, 4)]
        .iter()
        .enumerate()
        .map(|(i, &(channels, lead, tail))| {
            let p = dir.path().join(format!("take_{i}.wav"));
            write_wav(&p, channels, 16_000, &padded_keyword(lead, tail));
            p
        })
        .collect();

    let kw = build_from_wav_files("synth", &m.features, &paths).unwrap();
    assert_eq!(
        kw.templates.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["take_0.wav", "take_1.wav", "take_2.wav"]
    );
    // silence trimmed, identical takes
    for tpl in kw.templates.values() {
        assert_eq!(tpl.len(), KEYWORD_FRAMES);
    }
    assert_eq!(kw.average.as_ref().map(Vec::len), Some(KEYWORD_FRAMES));
    assert!(kw.validate().is_ok());

    let model_path = dir.path().join("model.kwm");
    let keyword_path = dir.path().join("synth.kwk");
    m.save_to_file(&model_path).unwrap();
    kw.save_to_file(&keyword_path).unwrap();

    let mut spotter = KeywordSpotter::new(&model_path, &keyword_path, 0.5).unwrap();
    let fired = detections(&mut spotter, &keyword_stream(50, 20));
    assert_eq!(fired.len(), 1, "fired at {fired:?}");
}

#[test]
fn keyword_file_round_trip() {
    let m = model();
    let kw = keyword_for(&m);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("synth.kwk");
    kw.save_to_file(&path).unwrap();
    let back = KeywordSpec::load_from_file(&path).unwrap();
    assert_eq!(back, kw);
    assert_eq!(back.features, m.features);
}

#[test]
fn wav_at_wrong_rate_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("slow.wav");
    write_wav(&p, 1, 8_000, &keyword_pcm());
    let err = build_from_wav_files("synth", &model().features, &[p]).unwrap_err();
    assert!(matches!(err, BuilderError::Wav { .. }), "{err}");
}

#[test]
fn missing_wav_is_io_error() {
    let err = build_from_wav_files("synth", &model().features, &["/no/such/take.wav"]).unwrap_err();
    assert!(matches!(err, BuilderError::Io { .. }));
}

#[test]
fn garbage_buffer_is_wav_error() {
    let err = build_from_wav_buffers(
        "synth",
        &model().features,
        [("junk.wav", b"RIFF nonsense".to_vec())],
    )
    .unwrap_err();
    assert!(matches!(err, BuilderError::Wav { ref name, .. } if name == "junk.wav"));
}

#[test]
fn silent_recording_is_too_short() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("quiet.wav");
    write_wav(&p, 1, 16_000, &silence(20));
    let err = build_from_wav_files("synth", &model().features, &[p]).unwrap_err();
    assert!(matches!(err, BuilderError::TooShort { voiced: 0, .. }));
}
