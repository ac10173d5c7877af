//! Deterministic engine with no rendering or audio output
//!
//! Used by the CLI to drive sessions end to end and by tests that need real
//! engine behavior (snapshots, SRAM, disks, cheats) rather than a recording.

use hashbrown::HashMap;
use retroview_shared::{Controller, KeyAction, MotionSource, ShaderConfig, Variable};
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use super::{Engine, EngineLoader, RumbleEvent, Viewport};
use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::game::GameSource;
use crate::input::InputEvent;

const SNAPSHOT_MAGIC: [u8; 4] = *b"RVHS";
const SNAPSHOT_VERSION: u16 = 2;
const HEADER_SIZE: usize = SNAPSHOT_MAGIC.len() + 2;
const CHECKSUM_SIZE: usize = 8;
const MOTION_SLOTS: usize = 4;
const CHEAT_PATCHES: usize = 4;

/// Number of controller ports exposed.
pub const PORT_COUNT: usize = 2;

/// Controller ids offered on every port.
pub const CONTROLLER_JOYPAD: u32 = 1;
pub const CONTROLLER_ANALOG: u32 = 5;

/// Knobs for [`HeadlessEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessOptions {
    /// Lowest GLES major version the engine accepts
    pub min_gles_version: u8,
    /// Variables the engine recognizes, with default values
    pub variables: Vec<Variable>,
    pub sram_size: usize,
    pub aspect_ratio: f32,
    /// Raise a rumble event on port 0 every N frames
    pub rumble_interval: Option<u64>,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            min_gles_version: 2,
            variables: vec![
                Variable::new("headless_region", "ntsc").with_description("Video region; ntsc|pal"),
                Variable::new("headless_frameskip", "0").with_description("Frames to skip; 0|1|2"),
            ],
            sram_size: 8 * 1024,
            aspect_ratio: 4.0 / 3.0,
            rumble_interval: None,
        }
    }
}

/// Loader producing [`HeadlessEngine`] instances.
#[derive(Debug, Clone, Default)]
pub struct HeadlessLoader {
    options: HeadlessOptions,
}

impl HeadlessLoader {
    pub fn new(options: HeadlessOptions) -> Self {
        Self { options }
    }
}

impl EngineLoader for HeadlessLoader {
    fn load(&self, config: &SessionConfig) -> Result<Box<dyn Engine>, EngineError> {
        Ok(Box::new(HeadlessEngine::new(self.options.clone(), config)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cheat {
    enabled: bool,
    patches: [(u16, u16); CHEAT_PATCHES],
    len: usize,
}

/// Parse `AAAA-VVVV` codes, several joined with `+`.
fn parse_cheat(code: &str) -> Result<Cheat, EngineError> {
    let mut cheat = Cheat {
        enabled: false,
        patches: [(0, 0); CHEAT_PATCHES],
        len: 0,
    };
    for part in code.split('+') {
        let (addr, value) = part
            .trim()
            .split_once('-')
            .ok_or_else(|| EngineError::Cheat(format!("malformed code '{part}'")))?;
        let parse_hex = |s: &str| {
            if s.len() != 4 {
                return None;
            }
            u16::from_str_radix(s, 16).ok()
        };
        let (Some(addr), Some(value)) = (parse_hex(addr), parse_hex(value)) else {
            return Err(EngineError::Cheat(format!("malformed code '{part}'")));
        };
        if cheat.len == cheat.patches.len() {
            return Err(EngineError::Cheat("too many patches in one cheat".into()));
        }
        cheat.patches[cheat.len] = (addr, value);
        cheat.len += 1;
    }
    Ok(cheat)
}

/// Deterministic stand-in for an emulation core.
///
/// Machine state is a frame counter, a PRNG seeded from the game image, the
/// port inputs, SRAM and the cheat table; snapshots carry all of it. Cheats
/// patch SRAM every frame.
pub struct HeadlessEngine {
    options: HeadlessOptions,
    gles_available: u8,
    rumble_enabled: bool,

    context_ready: bool,
    context_resets: u32,
    viewport: (u32, u32),
    video_rect: Viewport,
    loaded: bool,

    frame: u64,
    rng: u64,
    game: u64,
    buttons: [u16; PORT_COUNT],
    motion: [[(f32, f32); MOTION_SLOTS]; PORT_COUNT],
    sram: Vec<u8>,

    variables: Vec<Variable>,
    cheats: HashMap<u32, Cheat>,
    disks: Option<Vec<String>>,
    current_disk: u32,
    controller_types: [u32; PORT_COUNT],
    shader: ShaderConfig,
    audio_enabled: bool,
    rumble: Vec<RumbleEvent>,
    geometry_changed: bool,
}

impl HeadlessEngine {
    pub fn new(options: HeadlessOptions, config: &SessionConfig) -> Self {
        let mut variables = options.variables.clone();
        for initial in config.variables() {
            if let Some(var) = variables.iter_mut().find(|v| v.key == initial.key) {
                var.value = initial.value.clone();
            }
        }

        Self {
            gles_available: config.gles_version(),
            rumble_enabled: config.features().rumble,
            context_ready: false,
            context_resets: 0,
            viewport: (0, 0),
            video_rect: Viewport::FULL,
            loaded: false,
            frame: 0,
            rng: 0,
            game: 0,
            buttons: [0; PORT_COUNT],
            motion: [[(0.0, 0.0); MOTION_SLOTS]; PORT_COUNT],
            sram: vec![0; options.sram_size],
            variables,
            cheats: HashMap::new(),
            disks: None,
            current_disk: 0,
            controller_types: [CONTROLLER_JOYPAD; PORT_COUNT],
            shader: config.shader().clone(),
            audio_enabled: true,
            rumble: Vec::new(),
            geometry_changed: false,
            options,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn buttons(&self, port: usize) -> u16 {
        self.buttons.get(port).copied().unwrap_or(0)
    }

    /// Last position reported for a motion source.
    pub fn motion(&self, port: usize, source: MotionSource) -> Option<(f32, f32)> {
        self.motion.get(port).map(|m| m[source.id() as usize])
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn video_rect(&self) -> Viewport {
        self.video_rect
    }

    pub fn context_resets(&self) -> u32 {
        self.context_resets
    }

    pub fn shader(&self) -> &ShaderConfig {
        &self.shader
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    fn require_loaded(&self) -> Result<(), EngineError> {
        if self.loaded {
            Ok(())
        } else {
            Err(EngineError::Other("no game loaded".into()))
        }
    }

    fn hash_source(source: &GameSource) -> Result<(u64, Option<Vec<String>>), EngineError> {
        match source {
            GameSource::Path(path) => {
                let data = std::fs::read(path)
                    .map_err(|e| EngineError::LoadGame(format!("{}: {e}", path.display())))?;
                if data.is_empty() {
                    return Err(EngineError::LoadGame(format!("{} is empty", path.display())));
                }
                Ok((xxh3_64(&data), None))
            }
            GameSource::Bytes(data) => Ok((xxh3_64(data), None)),
            GameSource::VirtualFiles(files) => {
                let mut hasher = Xxh3::new();
                for file in files {
                    hasher.update(file.name().as_bytes());
                    hasher.update(file.data());
                }
                let names = files.iter().map(|f| f.name().to_string()).collect();
                Ok((hasher.digest(), Some(names)))
            }
        }
    }

    /// `magic | version | machine | sram | cheats | xxh3`, little-endian.
    fn encode_snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + 128 + self.sram.len());
        out.extend_from_slice(&SNAPSHOT_MAGIC);
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        out.extend_from_slice(&self.frame.to_le_bytes());
        out.extend_from_slice(&self.rng.to_le_bytes());
        out.extend_from_slice(&self.game.to_le_bytes());
        out.extend_from_slice(&self.current_disk.to_le_bytes());
        for buttons in self.buttons {
            out.extend_from_slice(&buttons.to_le_bytes());
        }
        for controller in self.controller_types {
            out.extend_from_slice(&controller.to_le_bytes());
        }
        for (x, y) in self.motion.iter().flatten() {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        }

        out.extend_from_slice(&(self.sram.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.sram);

        // Sorted so equal state always encodes to equal bytes
        let mut cheats: Vec<_> = self.cheats.iter().collect();
        cheats.sort_unstable_by_key(|(index, _)| **index);
        out.extend_from_slice(&(cheats.len() as u32).to_le_bytes());
        for (index, cheat) in cheats {
            out.extend_from_slice(&index.to_le_bytes());
            out.push(u8::from(cheat.enabled));
            out.push(cheat.len as u8);
            for (addr, value) in cheat.patches {
                out.extend_from_slice(&addr.to_le_bytes());
                out.extend_from_slice(&value.to_le_bytes());
            }
        }

        let checksum = xxh3_64(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }

    /// Decode and validate a snapshot against the loaded game without
    /// touching any state.
    fn decode_snapshot(&self, data: &[u8]) -> Result<Snapshot, EngineError> {
        if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(EngineError::Serialization(format!(
                "snapshot truncated at {} bytes",
                data.len()
            )));
        }
        if data[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            return Err(EngineError::Serialization("bad snapshot magic".into()));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != SNAPSHOT_VERSION {
            return Err(EngineError::Serialization(format!(
                "unsupported snapshot version {version}"
            )));
        }
        let (body, checksum) = data.split_at(data.len() - CHECKSUM_SIZE);
        let mut expected = [0u8; CHECKSUM_SIZE];
        expected.copy_from_slice(checksum);
        if xxh3_64(body) != u64::from_le_bytes(expected) {
            return Err(EngineError::Serialization("snapshot checksum mismatch".into()));
        }

        let mut reader = SnapshotReader::new(&body[HEADER_SIZE..]);
        let frame = reader.read_u64()?;
        let rng = reader.read_u64()?;
        let game = reader.read_u64()?;
        if game != self.game {
            return Err(EngineError::Serialization("snapshot belongs to another game".into()));
        }
        let current_disk = reader.read_u32()?;
        if let Some(disks) = &self.disks
            && current_disk as usize >= disks.len()
        {
            return Err(EngineError::Serialization("snapshot disk index out of range".into()));
        }

        let mut buttons = [0u16; PORT_COUNT];
        for slot in &mut buttons {
            *slot = reader.read_u16()?;
        }
        let mut controller_types = [CONTROLLER_JOYPAD; PORT_COUNT];
        for slot in &mut controller_types {
            let id = reader.read_u32()?;
            if !matches!(id, CONTROLLER_JOYPAD | CONTROLLER_ANALOG) {
                return Err(EngineError::Serialization(format!("unknown controller type {id}")));
            }
            *slot = id;
        }
        let mut motion = [[(0.0, 0.0); MOTION_SLOTS]; PORT_COUNT];
        for slot in motion.iter_mut().flatten() {
            *slot = (reader.read_f32()?, reader.read_f32()?);
        }

        let sram_len = reader.read_u32()? as usize;
        if sram_len != self.sram.len() {
            return Err(EngineError::Serialization(format!(
                "snapshot SRAM is {sram_len} bytes, expected {}",
                self.sram.len()
            )));
        }
        let sram = reader.take(sram_len)?.to_vec();

        let cheat_count = reader.read_u32()?;
        let mut cheats = HashMap::new();
        for _ in 0..cheat_count {
            let index = reader.read_u32()?;
            let enabled = reader.read_u8()? != 0;
            let len = usize::from(reader.read_u8()?);
            if len == 0 || len > CHEAT_PATCHES {
                return Err(EngineError::Serialization(format!("cheat {index} has {len} patches")));
            }
            let mut patches = [(0, 0); CHEAT_PATCHES];
            for patch in &mut patches {
                *patch = (reader.read_u16()?, reader.read_u16()?);
            }
            cheats.insert(
                index,
                Cheat {
                    enabled,
                    patches,
                    len,
                },
            );
        }
        reader.finish()?;

        Ok(Snapshot {
            frame,
            rng,
            current_disk,
            buttons,
            controller_types,
            motion,
            sram,
            cheats,
        })
    }

    fn step_rng(&mut self) {
        let mut x = self.rng ^ u64::from(self.buttons[0]) ^ (u64::from(self.buttons[1]) << 16);
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
    }

    fn apply_cheats(&mut self) {
        if self.sram.is_empty() {
            return;
        }
        let len = self.sram.len();
        for cheat in self.cheats.values().filter(|c| c.enabled) {
            for &(addr, value) in &cheat.patches[..cheat.len] {
                self.sram[usize::from(addr) % len] = value as u8;
            }
        }
    }
}

/// Machine state decoded from a validated snapshot.
struct Snapshot {
    frame: u64,
    rng: u64,
    current_disk: u32,
    buttons: [u16; PORT_COUNT],
    controller_types: [u32; PORT_COUNT],
    motion: [[(f32, f32); MOTION_SLOTS]; PORT_COUNT],
    sram: Vec<u8>,
    cheats: HashMap<u32, Cheat>,
}

struct SnapshotReader<'a> {
    bytes: &'a [u8],
}

impl<'a> SnapshotReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], EngineError> {
        if self.bytes.len() < len {
            return Err(EngineError::Serialization("snapshot truncated".into()));
        }
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], EngineError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn read_u8(&mut self) -> Result<u8, EngineError> {
        Ok(self.array::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16, EngineError> {
        self.array().map(u16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Result<u32, EngineError> {
        self.array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Result<u64, EngineError> {
        self.array().map(u64::from_le_bytes)
    }

    fn read_f32(&mut self) -> Result<f32, EngineError> {
        self.array().map(f32::from_le_bytes)
    }

    fn finish(self) -> Result<(), EngineError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Serialization(format!(
                "{} trailing bytes in snapshot",
                self.bytes.len()
            )))
        }
    }
}

impl Engine for HeadlessEngine {
    fn context_created(&mut self) {
        self.context_ready = true;
    }

    fn context_reset(&mut self) {
        self.context_resets += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.video_rect {
            self.video_rect = viewport;
            self.geometry_changed = true;
        }
    }

    fn load_game(&mut self, source: &GameSource) -> Result<(), EngineError> {
        if self.gles_available < self.options.min_gles_version {
            return Err(EngineError::GlNotCompatible {
                required: self.options.min_gles_version,
                available: self.gles_available,
            });
        }
        if !self.context_ready {
            return Err(EngineError::Other("no rendering context".into()));
        }

        let (game, disks) = Self::hash_source(source)?;
        self.game = game;
        self.rng = game | 1;
        self.disks = disks;
        self.current_disk = 0;
        self.loaded = true;
        self.geometry_changed = true;
        Ok(())
    }

    fn run_frame(&mut self) -> Result<(), EngineError> {
        self.require_loaded()?;
        self.frame += 1;
        self.step_rng();
        if !self.sram.is_empty() {
            let len = self.sram.len();
            self.sram[(self.frame as usize) % len] ^= self.rng as u8;
        }
        self.apply_cheats();

        if let Some(interval) = self.options.rumble_interval
            && interval > 0
            && self.frame % interval == 0
            && self.rumble_enabled
        {
            self.rumble.push(RumbleEvent {
                port: 0,
                strength_weak: 0.25,
                strength_strong: 0.75,
            });
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.require_loaded()?;
        self.frame = 0;
        self.rng = self.game | 1;
        self.buttons = [0; PORT_COUNT];
        Ok(())
    }

    fn serialize_state(&mut self) -> Result<Vec<u8>, EngineError> {
        self.require_loaded()?;
        Ok(self.encode_snapshot())
    }

    fn unserialize_state(&mut self, data: &[u8]) -> Result<(), EngineError> {
        self.require_loaded()?;
        let snapshot = self.decode_snapshot(data)?;

        self.frame = snapshot.frame;
        self.rng = snapshot.rng;
        if snapshot.current_disk != self.current_disk {
            self.current_disk = snapshot.current_disk;
            self.geometry_changed = true;
        }
        self.buttons = snapshot.buttons;
        self.controller_types = snapshot.controller_types;
        self.motion = snapshot.motion;
        self.sram = snapshot.sram;
        self.cheats = snapshot.cheats;
        Ok(())
    }

    fn serialize_sram(&mut self) -> Result<Vec<u8>, EngineError> {
        self.require_loaded()?;
        Ok(self.sram.clone())
    }

    fn unserialize_sram(&mut self, data: &[u8]) -> Result<(), EngineError> {
        self.require_loaded()?;
        if data.len() != self.sram.len() {
            return Err(EngineError::Serialization(format!(
                "SRAM is {} bytes, got {}",
                self.sram.len(),
                data.len()
            )));
        }
        self.sram.copy_from_slice(data);
        Ok(())
    }

    fn set_cheat(&mut self, index: u32, enabled: bool, code: &str) -> Result<(), EngineError> {
        self.require_loaded()?;
        let mut cheat = parse_cheat(code)?;
        cheat.enabled = enabled;
        self.cheats.insert(index, cheat);
        Ok(())
    }

    fn reset_cheats(&mut self) -> Result<(), EngineError> {
        self.require_loaded()?;
        self.cheats.clear();
        Ok(())
    }

    fn disk_count(&self) -> Option<u32> {
        self.disks.as_ref().map(|d| d.len() as u32)
    }

    fn current_disk(&self) -> u32 {
        self.current_disk
    }

    fn set_disk(&mut self, index: u32) -> Result<(), EngineError> {
        let count = self
            .disk_count()
            .ok_or_else(|| EngineError::Other("game has no disk control".into()))?;
        if index >= count {
            return Err(EngineError::Other(format!("disk {index} out of range (0..{count})")));
        }
        if index != self.current_disk {
            self.current_disk = index;
            self.geometry_changed = true;
        }
        Ok(())
    }

    fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    fn set_variable(&mut self, variable: &Variable) {
        if let Some(var) = self.variables.iter_mut().find(|v| v.key == variable.key) {
            var.value = variable.value.clone();
        }
    }

    fn controllers(&self) -> Vec<Vec<Controller>> {
        (0..PORT_COUNT)
            .map(|_| {
                vec![
                    Controller::new(CONTROLLER_JOYPAD, "RetroPad"),
                    Controller::new(CONTROLLER_ANALOG, "DualAnalog"),
                ]
            })
            .collect()
    }

    fn set_controller_type(&mut self, port: u32, controller_id: u32) -> bool {
        let known = matches!(controller_id, CONTROLLER_JOYPAD | CONTROLLER_ANALOG);
        match self.controller_types.get_mut(port as usize) {
            Some(slot) if known => {
                *slot = controller_id;
                true
            }
            _ => false,
        }
    }

    fn set_shader(&mut self, shader: &ShaderConfig) {
        self.shader = shader.clone();
    }

    fn apply_input(&mut self, event: &InputEvent) {
        let port = event.port() as usize;
        if port >= PORT_COUNT {
            return;
        }
        match event {
            InputEvent::Key(key) => {
                let bit = 1u16 << key.button.id();
                match key.action {
                    KeyAction::Down => self.buttons[port] |= bit,
                    KeyAction::Up => self.buttons[port] &= !bit,
                }
            }
            InputEvent::Motion(motion) => {
                self.motion[port][motion.source.id() as usize] = (motion.x, motion.y);
            }
        }
    }

    fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }

    fn set_rumble_enabled(&mut self, enabled: bool) {
        self.rumble_enabled = enabled;
        if !enabled {
            self.rumble.clear();
        }
    }

    fn take_rumble(&mut self) -> Vec<RumbleEvent> {
        std::mem::take(&mut self.rumble)
    }

    fn take_geometry_change(&mut self) -> bool {
        std::mem::take(&mut self.geometry_changed)
    }

    fn aspect_ratio(&self) -> f32 {
        self.options.aspect_ratio
    }

    fn release(&mut self) {
        self.loaded = false;
        self.context_ready = false;
        self.cheats.clear();
        self.rumble.clear();
    }
}
