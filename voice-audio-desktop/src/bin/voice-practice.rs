use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use voice_audio_core::storage::download::read_metadata;
use voice_audio_core::{Note, VoiceAudioConfig, VoiceAudioEngine, VoiceAudioError, Waveform};
use voice_audio_desktop::{desktop_services, DeviceEnumerator, LogDelegate};

#[derive(Parser)]
#[command(name = "voice-practice")]
#[command(version)]
#[command(about = "Pitch monitor, reference drone and recorder for voice practice")]
struct Cli {
    /// Input device name (see `devices`). Defaults to the system microphone.
    #[arg(short, long, global = true, value_name = "NAME")]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List input devices
    Devices,

    /// Print the detected pitch of the microphone signal
    Monitor {
        /// How long to listen
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },

    /// Play a reference tone
    Drone {
        /// Note to play, A3 through G4
        #[arg(short, long, default_value = "C4")]
        note: Note,

        /// sine, triangle, sawtooth or square
        #[arg(short, long, default_value = "sine")]
        waveform: Waveform,

        /// Output level in percent, 0–200
        #[arg(short, long, default_value_t = 100)]
        volume: u16,

        /// Keep the bright upper harmonics
        #[arg(long)]
        bright: bool,

        /// Lift highs and compress for small speakers
        #[arg(long)]
        phone_boost: bool,

        #[arg(short, long, default_value_t = 5)]
        seconds: u64,
    },

    /// Record the microphone to a WAV file
    Record {
        #[arg(short, long, default_value_t = 5)]
        seconds: u64,

        /// Directory the recording and its metadata are written to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Show the detected pitch while recording
        #[arg(long)]
        monitor: bool,
    },

    /// Show the metadata saved next to a recording
    Info {
        /// Recording file written by `record`
        path: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), VoiceAudioError> {
    match cli.command {
        Commands::Devices => list_devices(),
        Commands::Monitor { seconds } => {
            let mut engine = engine(cli.device.as_deref())?;
            engine.startup()?;
            print_pitch_for(&engine, Duration::from_secs(seconds));
            engine.shutdown();
            Ok(())
        }
        Commands::Drone {
            note,
            waveform,
            volume,
            bright,
            phone_boost,
            seconds,
        } => {
            let mut engine = engine(cli.device.as_deref())?;
            engine.set_note(note);
            engine.set_waveform(waveform);
            engine.set_volume_pct(volume);
            engine.set_soften_highs(!bright);
            engine.set_phone_boost(phone_boost);

            engine.start_drone()?;
            println!("Playing {} ({:.2} Hz) for {}s", note, note.frequency(), seconds);
            thread::sleep(Duration::from_secs(seconds));
            engine.stop_drone();
            Ok(())
        }
        Commands::Record { seconds, out, monitor } => {
            let mut engine = engine(cli.device.as_deref())?;
            if monitor {
                engine.startup()?;
            }
            engine.start_recording()?;
            println!("Recording for {}s...", seconds);
            if monitor {
                print_pitch_for(&engine, Duration::from_secs(seconds));
            } else {
                thread::sleep(Duration::from_secs(seconds));
            }
            engine.stop_recording();
            engine.wait_for_recordings();

            let Some(recording) = engine.last_recording() else {
                return Err(VoiceAudioError::EncoderFailure("no recording produced".into()));
            };
            let path = engine.save_download(&recording, &out)?;
            println!(
                "Saved {} ({:.1}s, sha256 {})",
                path.display(),
                recording.duration_secs,
                recording.checksum
            );
            engine.shutdown();
            Ok(())
        }
        Commands::Info { path } => {
            let metadata = read_metadata(&path)?;
            println!("id:        {}", metadata.id);
            println!("created:   {}", metadata.created_at);
            println!("duration:  {:.1}s", metadata.duration_secs);
            println!("format:    {} ({})", metadata.mime_type, metadata.encoding);
            println!("size:      {} bytes", metadata.size_bytes);
            println!("sha256:    {}", metadata.checksum);
            Ok(())
        }
    }
}

fn engine(device: Option<&str>) -> Result<VoiceAudioEngine, VoiceAudioError> {
    let config = VoiceAudioConfig::default();
    let services = desktop_services(&config, device)?;
    let mut engine = VoiceAudioEngine::new(config, services)?;
    engine.set_delegate(Arc::new(LogDelegate));
    Ok(engine)
}

fn list_devices() -> Result<(), VoiceAudioError> {
    let devices = DeviceEnumerator::new().list_capture_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {} ({:?})", marker, device.name, device.transport);
    }
    Ok(())
}

fn print_pitch_for(engine: &VoiceAudioEngine, duration: Duration) {
    let deadline = Instant::now() + duration;
    let mut last = None;
    while Instant::now() < deadline {
        let pitch = engine.pitch();
        if last != Some(pitch) {
            println!("{}", pitch);
            last = Some(pitch);
        }
        thread::sleep(Duration::from_millis(100));
    }
}
