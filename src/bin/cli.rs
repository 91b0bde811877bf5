use clap::{App, Arg, ArgMatches, SubCommand};
use handwave::{
    channel::ChannelLayout,
    intent::IntentSet,
    pipeline::replay,
    ChannelConfig, EngineConfig, FrameRecording, HandwaveError, Result,
};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("handwave-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Handwave gesture intent recognition tool")
        .subcommand(
            SubCommand::with_name("layout")
                .about("Print the shared frame channel layout")
                .arg(
                    Arg::with_name("hands")
                        .long("hands")
                        .value_name("COUNT")
                        .help("Maximum hands per frame")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("faces")
                        .long("faces")
                        .value_name("COUNT")
                        .help("Maximum faces per frame")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("face-landmarks")
                        .long("face-landmarks")
                        .value_name("COUNT")
                        .help("Maximum landmarks per face")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("inspect")
                .about("Validate an intent file and list its intents")
                .arg(
                    Arg::with_name("intents")
                        .short("i")
                        .long("intents")
                        .value_name("FILE")
                        .help("JSON array of intent definitions")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("replay")
                .about("Run a frame recording through the engine and print events as JSON lines")
                .arg(
                    Arg::with_name("intents")
                        .short("i")
                        .long("intents")
                        .value_name("FILE")
                        .help("JSON array of intent definitions")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("frames")
                        .short("f")
                        .long("frames")
                        .value_name("FILE")
                        .help("Frame recording (.jsonl or bincode)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("config")
                        .short("c")
                        .long("config")
                        .value_name("FILE")
                        .help("Engine configuration as JSON")
                        .takes_value(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("layout", Some(sub)) => handle_layout(sub),
        ("inspect", Some(sub)) => handle_inspect(sub),
        ("replay", Some(sub)) => handle_replay(sub),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_count(matches: &ArgMatches, name: &str) -> Result<Option<usize>> {
    matches
        .value_of(name)
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| HandwaveError::invalid_parameter(name, "expected a non-negative integer"))
        })
        .transpose()
}

fn handle_layout(matches: &ArgMatches) -> Result<()> {
    let mut config = ChannelConfig::default();
    if let Some(hands) = parse_count(matches, "hands")? {
        config = config.with_max_hands(hands);
    }
    if let Some(faces) = parse_count(matches, "faces")? {
        config = config.with_max_faces(faces);
    }
    if let Some(count) = parse_count(matches, "face-landmarks")? {
        config = config.with_max_face_landmarks(count);
    }

    let layout = ChannelLayout::new(&config)?;
    println!("Frame channel layout:");
    println!("  max hands:          {}", layout.max_hands);
    println!("  max faces:          {}", layout.max_faces);
    println!("  max face landmarks: {}", layout.max_face_landmarks);
    println!("  hand block:         {} bytes", layout.hand_size);
    println!("  face block:         {} bytes", layout.face_size);
    println!("  slot:               {} bytes", layout.slot_size);
    println!("  slot 0 offset:      {}", layout.slot_offset(0));
    println!("  slot 1 offset:      {}", layout.slot_offset(1));
    println!("  total:              {} bytes", layout.total_size);
    Ok(())
}

fn handle_inspect(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .value_of("intents")
        .ok_or_else(|| HandwaveError::invalid_parameter("intents", "missing"))?;
    let set = IntentSet::load(Path::new(path))?;

    println!("{} intents:", set.len());
    for intent in set.intents() {
        println!(
            "  {:<24} specificity={:<3} group={:<12} priority={:<4} minDuration={}ms maxGap={}ms",
            intent.id(),
            intent.specificity(),
            intent.group().unwrap_or("-"),
            intent.priority(),
            intent.temporal().min_duration_ms,
            intent.temporal().max_gap_ms,
        );
    }
    Ok(())
}

fn handle_replay(matches: &ArgMatches) -> Result<()> {
    let intents_path = matches
        .value_of("intents")
        .ok_or_else(|| HandwaveError::invalid_parameter("intents", "missing"))?;
    let frames_path = matches
        .value_of("frames")
        .ok_or_else(|| HandwaveError::invalid_parameter("frames", "missing"))?;

    let engine_config = match matches.value_of("config") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| HandwaveError::from_io(e, &format!("Failed to read {}", path)))?;
            serde_json::from_str::<EngineConfig>(&text)?
        }
        None => EngineConfig::default(),
    };

    let intents = IntentSet::load(Path::new(intents_path))?;
    let recording = FrameRecording::load(Path::new(frames_path))?;
    recording.validate()?;

    let events = replay(
        &recording.frames,
        intents.into_intents(),
        engine_config,
        ChannelConfig::default(),
    )?;
    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    log::info!("{} frames produced {} events", recording.len(), events.len());
    Ok(())
}
