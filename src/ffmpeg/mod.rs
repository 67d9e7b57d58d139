//! Pure builders for the encoder's argument vectors.
//!
//! Nothing in this module touches the filesystem or spawns a process; every
//! function is deterministic in its inputs, which is what the unit tests
//! exercise directly.

use std::path::Path;

use crate::preset::{EncodeRequest, QualityMode};
use crate::thumbnail::{GifRequest, StillRequest};

/// Global flags shared by every encoder invocation: overwrite without
/// prompting, keep the primary output channel clean of banner/log text, and
/// emit the machine-readable progress stream on it.
fn base_args() -> Vec<String> {
    [
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
        "-y",
    ]
    .map(String::from)
    .to_vec()
}

fn push(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

/// Build the argument vector for a full transcode
pub fn transcode_args(request: &EncodeRequest) -> Vec<String> {
    let mut args = base_args();

    push(&mut args, &["-i", &request.source_path.to_string_lossy()]);

    // Explicit stream mapping: the video stream, the first audio stream if
    // present, and any subtitle streams.
    push(&mut args, &["-map", "0:v:0", "-map", "0:a:0?", "-map", "0:s?"]);

    push(&mut args, &["-c:v", &request.video_codec]);

    match request.quality {
        QualityMode::Crf(value) => push(&mut args, &["-crf", &value.to_string()]),
        QualityMode::Cq(value) => push(&mut args, &["-cq", &value.to_string()]),
        QualityMode::Cbr(mbps) => {
            let bitrate = format!("{mbps}M");
            push(
                &mut args,
                &[
                    "-b:v", &bitrate, "-minrate", &bitrate, "-maxrate", &bitrate, "-bufsize",
                    "2M",
                ],
            );
        }
    }

    push(&mut args, &["-c:a", &request.audio_codec]);

    // MP4 cannot carry most text subtitle codecs as-is.
    if request.container.eq_ignore_ascii_case("mp4") {
        push(&mut args, &["-c:s", "mov_text"]);
    } else {
        push(&mut args, &["-c:s", "copy"]);
    }

    // Most broadly compatible pixel format.
    push(&mut args, &["-pix_fmt", "yuv420p"]);

    args.extend(request.extra_args.iter().cloned());

    args.push(request.dest_path.to_string_lossy().into_owned());
    args
}

fn gif_filter(request: &GifRequest) -> String {
    format!(
        "fps={},scale={}:-1:flags=lanczos",
        request.fps, request.width
    )
}

/// Build the palette-extraction pass for an animated thumbnail: sample
/// frames in the requested window, scale preserving aspect ratio, and emit
/// a single limited-color palette image.
pub fn palette_args(request: &GifRequest, palette_path: &Path) -> Vec<String> {
    let mut args = base_args();

    push(
        &mut args,
        &[
            "-ss",
            &format!("{:.3}", request.start_secs),
            "-t",
            &format!("{:.3}", request.duration_secs),
            "-i",
            &request.source_path.to_string_lossy(),
        ],
    );
    push(
        &mut args,
        &[
            "-vf",
            &format!("{},palettegen", gif_filter(request)),
            "-frames:v",
            "1",
        ],
    );

    args.push(palette_path.to_string_lossy().into_owned());
    args
}

/// Build the final palette-based render pass, compositing the same
/// sample/scale filter against the previously generated palette image.
pub fn render_args(request: &GifRequest, palette_path: &Path) -> Vec<String> {
    let mut args = base_args();

    push(
        &mut args,
        &[
            "-ss",
            &format!("{:.3}", request.start_secs),
            "-t",
            &format!("{:.3}", request.duration_secs),
            "-i",
            &request.source_path.to_string_lossy(),
            "-i",
            &palette_path.to_string_lossy(),
        ],
    );
    push(
        &mut args,
        &[
            "-filter_complex",
            &format!("{}[x];[x][1:v]paletteuse", gif_filter(request)),
        ],
    );

    args.push(request.dest_path.to_string_lossy().into_owned());
    args
}

/// Build a single-frame still extraction: seek, grab one frame, encode as a
/// compressed still image.
pub fn still_args(request: &StillRequest) -> Vec<String> {
    let mut args = base_args();

    push(
        &mut args,
        &[
            "-ss",
            &format!("{:.3}", request.timestamp_secs),
            "-i",
            &request.source_path.to_string_lossy(),
            "-frames:v",
            "1",
            "-q:v",
            "2",
        ],
    );

    args.push(request.dest_path.to_string_lossy().into_owned());
    args
}

/// Build the read-only ffprobe query for a source's total duration
pub fn probe_args(input: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        input.to_string_lossy().into_owned(),
    ]
}
