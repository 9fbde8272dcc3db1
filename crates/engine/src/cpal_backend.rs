//! Output through the system's default device via cpal.
//!
//! ```text
//! UI thread                                    audio thread
//! CpalBackend::transport ─┐
//! CpalChannel ────────────┴─ one rtrb ring ──► RtBus ─► mono bus ─► every output channel
//!      ▲                                         │
//!      └──── BusClock atomics (played, stop acks) ◄┘
//! ```
//!
//! Every command for the stream goes through a single ring, so a transport
//! command reaches all voices in the same drain and commands keep the order
//! they were sent in. Segments cross into the callback as `basedrop::Shared`,
//! so a replaced stem buffer is never freed on the audio thread; `collect()`
//! frees it later.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use basedrop::{Collector, Handle, Shared};
use cpal::{
    FromSample, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::backend::{AudioBackend, PlayerChannel, Segment, Transport};
use crate::error::EngineError;
use crate::voice::Voice;

const COMMAND_CAPACITY: usize = 1024;

enum VoiceCommand {
    Schedule(Shared<Segment>),
    Play,
    Pause,
    Stop,
    Volume(f32),
}

enum BusCommand {
    Voice(usize, VoiceCommand),
    Transport(Transport),
    /// Acknowledge every stop sent up to `seq`
    StopAck(u64),
}

struct BusClock {
    played: Vec<AtomicU64>,
    /// Sequence number of the last stop the audio thread has applied
    stops: AtomicU64,
}

struct CommandSender {
    producer: rtrb::Producer<BusCommand>,
    stops_sent: u64,
}

impl CommandSender {
    fn send(&mut self, command: BusCommand) -> bool {
        if self.producer.push(command).is_err() {
            log::error!("command queue full, command dropped");
            return false;
        }
        true
    }

    /// Send `command` followed by a stop acknowledgement, so clocks read 0
    /// until the audio thread has applied it.
    fn send_stop(&mut self, command: BusCommand) {
        let seq = self.stops_sent + 1;
        if self.send(command) && self.send(BusCommand::StopAck(seq)) {
            self.stops_sent = seq;
        }
    }
}

type SharedSender = Arc<Mutex<CommandSender>>;

fn lock(sender: &SharedSender) -> std::sync::MutexGuard<'_, CommandSender> {
    sender.lock().unwrap_or_else(PoisonError::into_inner)
}

struct RtBus {
    voices: Vec<Voice<Shared<Segment>>>,
    commands: rtrb::Consumer<BusCommand>,
    clock: Arc<BusClock>,
}

impl RtBus {
    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                BusCommand::Voice(index, command) => {
                    let Some(voice) = self.voices.get_mut(index) else {
                        continue;
                    };
                    match command {
                        VoiceCommand::Schedule(segment) => {
                            voice.schedule(segment);
                        }
                        VoiceCommand::Play => voice.play(),
                        VoiceCommand::Pause => voice.pause(),
                        VoiceCommand::Stop => {
                            voice.stop();
                        }
                        VoiceCommand::Volume(volume) => voice.set_volume(volume),
                    }
                }
                BusCommand::Transport(transport) => {
                    for voice in &mut self.voices {
                        match transport {
                            Transport::Play => voice.play(),
                            Transport::Pause => voice.pause(),
                            Transport::Stop => {
                                voice.stop();
                            }
                        }
                    }
                }
                BusCommand::StopAck(seq) => {
                    self.publish();
                    self.clock.stops.store(seq, Ordering::Release);
                }
            }
        }
    }

    fn publish(&self) {
        for (voice, played) in self.voices.iter().zip(&self.clock.played) {
            played.store(voice.played(), Ordering::Release);
        }
    }

    /// Drain pending commands, then mix one buffer of interleaved output.
    fn process<T>(&mut self, data: &mut [T], output_channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        self.apply_commands();

        for frame in data.chunks_mut(output_channels) {
            let mut mixed = 0.0f32;
            for voice in self.voices.iter_mut() {
                mixed += voice.next_sample();
            }
            let value = T::from_sample(mixed);
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }

        self.publish();
    }
}

/// A bus of `channel_count` voices and the channel handles that feed it.
fn create_bus(channel_count: usize, handle: &Handle) -> (RtBus, Vec<CpalChannel>, SharedSender) {
    let (producer, consumer) = rtrb::RingBuffer::<BusCommand>::new(COMMAND_CAPACITY);
    let sender = Arc::new(Mutex::new(CommandSender {
        producer,
        stops_sent: 0,
    }));
    let clock = Arc::new(BusClock {
        played: (0..channel_count).map(|_| AtomicU64::new(0)).collect(),
        stops: AtomicU64::new(0),
    });

    let channels = (0..channel_count)
        .map(|index| CpalChannel {
            index,
            sender: Arc::clone(&sender),
            clock: Arc::clone(&clock),
            handle: handle.clone(),
        })
        .collect();
    let bus = RtBus {
        voices: (0..channel_count).map(|_| Voice::new()).collect(),
        commands: consumer,
        clock,
    };
    (bus, channels, sender)
}

fn send_transport(sender: &SharedSender, transport: Transport) {
    let mut sender = lock(sender);
    match transport {
        Transport::Stop => sender.send_stop(BusCommand::Transport(transport)),
        _ => {
            sender.send(BusCommand::Transport(transport));
        }
    }
}

pub struct CpalBackend {
    collector: Collector,
    stream: Option<cpal::Stream>,
    sender: Option<SharedSender>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            collector: Collector::new(),
            stream: None,
            sender: None,
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Channel = CpalChannel;

    fn start(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
    ) -> Result<Vec<CpalChannel>, EngineError> {
        self.shutdown();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        let config = output_config(&device, sample_rate)?;

        let (bus, channels, sender) = create_bus(channel_count, &self.collector.handle());
        let stream = build_stream::<f32>(&device, &config, bus)?;
        stream.play()?;

        log::info!(
            "output stream started: {} Hz, {} output channels, {} player channels",
            sample_rate,
            config.channels,
            channel_count
        );
        self.stream = Some(stream);
        self.sender = Some(sender);
        Ok(channels)
    }

    fn shutdown(&mut self) {
        self.sender = None;
        if self.stream.take().is_some() {
            log::debug!("output stream stopped");
        }
        self.collector.collect();
    }

    fn transport(&mut self, command: Transport) {
        if let Some(sender) = &self.sender {
            send_transport(sender, command);
        }
    }

    fn collect(&mut self) {
        self.collector.collect();
    }
}

fn output_config(device: &cpal::Device, sample_rate: u32) -> Result<cpal::StreamConfig, EngineError> {
    let rate = cpal::SampleRate(sample_rate);
    let range = device
        .supported_output_configs()?
        .filter(|range| range.sample_format() == cpal::SampleFormat::F32)
        .find(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .ok_or(EngineError::UnsupportedSampleRate(sample_rate))?;
    Ok(range.with_sample_rate(rate).config())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut bus: RtBus,
) -> Result<cpal::Stream, EngineError>
where
    T: SizedSample + FromSample<f32>,
{
    let output_channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            bus.process(data, output_channels);
        },
        |err| log::error!("stream error: {err}"),
        None,
    )?;

    Ok(stream)
}

pub struct CpalChannel {
    index: usize,
    sender: SharedSender,
    clock: Arc<BusClock>,
    handle: Handle,
}

impl CpalChannel {
    fn send(&self, command: VoiceCommand) -> bool {
        lock(&self.sender).send(BusCommand::Voice(self.index, command))
    }
}

impl PlayerChannel for CpalChannel {
    fn schedule(&mut self, segment: Segment) -> bool {
        let segment = Shared::new(&self.handle, segment);
        self.send(VoiceCommand::Schedule(segment))
    }

    fn play(&mut self) {
        self.send(VoiceCommand::Play);
    }

    fn pause(&mut self) {
        self.send(VoiceCommand::Pause);
    }

    fn stop(&mut self) {
        lock(&self.sender).send_stop(BusCommand::Voice(self.index, VoiceCommand::Stop));
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(VoiceCommand::Volume(volume));
    }

    /// Reads 0 until the audio thread has applied the latest stop, so a
    /// freshly rescheduled channel never reports the previous run's clock.
    fn played_frames(&self) -> u64 {
        let stops_sent = lock(&self.sender).stops_sent;
        if self.clock.stops.load(Ordering::Acquire) != stops_sent {
            return 0;
        }
        self.clock
            .played
            .get(self.index)
            .map_or(0, |played| played.load(Ordering::Acquire))
    }
}
