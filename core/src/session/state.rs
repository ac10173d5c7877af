//! Session lifecycle states and the operation guard table

use std::fmt;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Uninitialized = 0,
    Created = 1,
    SurfaceReady = 2,
    Running = 3,
    Paused = 4,
    Destroyed = 5,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::Uninitialized,
        SessionState::Created,
        SessionState::SurfaceReady,
        SessionState::Running,
        SessionState::Paused,
        SessionState::Destroyed,
    ];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::Created),
            2 => Some(Self::SurfaceReady),
            3 => Some(Self::Running),
            4 => Some(Self::Paused),
            5 => Some(Self::Destroyed),
            _ => None,
        }
    }

    /// A game is loaded and the engine accepts game-scoped calls.
    pub const fn has_game(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// A rendering context exists.
    pub const fn has_surface(self) -> bool {
        matches!(self, Self::SurfaceReady | Self::Running | Self::Paused)
    }

    /// State reached when `op` succeeds from `self`.
    ///
    /// Returns `None` when `op` is not allowed here. Operations that are not
    /// lifecycle transitions keep the current state.
    pub fn after(self, op: Operation) -> Option<SessionState> {
        if !op.is_allowed_in(self) {
            return None;
        }
        Some(match (op, self) {
            (Operation::Create, _) => Self::Created,
            (Operation::SurfaceCreated, Self::Created) => Self::SurfaceReady,
            (Operation::LoadGame, _) => Self::Running,
            (Operation::Pause, _) => Self::Paused,
            (Operation::Resume, _) => Self::Running,
            (Operation::Destroy, _) => Self::Destroyed,
            (_, state) => state,
        })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Created => "created",
            Self::SurfaceReady => "surface ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Destroyed => "destroyed",
        })
    }
}

use SessionState::*;

const ANY: &[SessionState] = &SessionState::ALL;
const CREATED_PLUS: &[SessionState] = &[Created, SurfaceReady, Running, Paused];
const SURFACE_PLUS: &[SessionState] = &[SurfaceReady, Running, Paused];
const GAME_LOADED: &[SessionState] = &[Running, Paused];

/// Every command the controller accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    SurfaceCreated,
    SurfaceChanged,
    SetViewport,
    LoadGame,
    Step,
    Pause,
    Resume,
    Reset,
    SerializeState,
    RestoreState,
    SerializeSram,
    RestoreSram,
    SetCheat,
    ResetCheats,
    ChangeDisk,
    AvailableDisks,
    CurrentDisk,
    UpdateVariable,
    GetVariables,
    GetControllers,
    SetControllerType,
    SetShaderConfig,
    SetFrameSpeed,
    SetAudioEnabled,
    SetRumbleEnabled,
    AspectRatio,
    Input,
    Destroy,
}

impl Operation {
    pub const ALL: [Operation; 29] = [
        Operation::Create,
        Operation::SurfaceCreated,
        Operation::SurfaceChanged,
        Operation::SetViewport,
        Operation::LoadGame,
        Operation::Step,
        Operation::Pause,
        Operation::Resume,
        Operation::Reset,
        Operation::SerializeState,
        Operation::RestoreState,
        Operation::SerializeSram,
        Operation::RestoreSram,
        Operation::SetCheat,
        Operation::ResetCheats,
        Operation::ChangeDisk,
        Operation::AvailableDisks,
        Operation::CurrentDisk,
        Operation::UpdateVariable,
        Operation::GetVariables,
        Operation::GetControllers,
        Operation::SetControllerType,
        Operation::SetShaderConfig,
        Operation::SetFrameSpeed,
        Operation::SetAudioEnabled,
        Operation::SetRumbleEnabled,
        Operation::AspectRatio,
        Operation::Input,
        Operation::Destroy,
    ];

    /// States in which the operation may run.
    pub const fn allowed_states(self) -> &'static [SessionState] {
        match self {
            Operation::Create => &[Uninitialized],
            Operation::SurfaceCreated
            | Operation::SurfaceChanged
            | Operation::UpdateVariable
            | Operation::GetVariables
            | Operation::SetFrameSpeed
            | Operation::SetAudioEnabled
            | Operation::SetRumbleEnabled => CREATED_PLUS,
            Operation::LoadGame => &[SurfaceReady],
            Operation::Step | Operation::Pause => &[Running],
            Operation::Resume => &[Paused],
            Operation::Reset
            | Operation::SerializeState
            | Operation::RestoreState
            | Operation::SerializeSram
            | Operation::RestoreSram
            | Operation::SetCheat
            | Operation::ResetCheats
            | Operation::ChangeDisk
            | Operation::AvailableDisks
            | Operation::CurrentDisk
            | Operation::GetControllers
            | Operation::SetControllerType
            | Operation::AspectRatio => GAME_LOADED,
            Operation::SetViewport | Operation::SetShaderConfig | Operation::Input => SURFACE_PLUS,
            Operation::Destroy => ANY,
        }
    }

    pub fn is_allowed_in(self, state: SessionState) -> bool {
        self.allowed_states().contains(&state)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::SurfaceCreated => "surface_created",
            Operation::SurfaceChanged => "surface_changed",
            Operation::SetViewport => "set_viewport",
            Operation::LoadGame => "load_game",
            Operation::Step => "step",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Reset => "reset",
            Operation::SerializeState => "serialize_state",
            Operation::RestoreState => "restore_state",
            Operation::SerializeSram => "serialize_sram",
            Operation::RestoreSram => "restore_sram",
            Operation::SetCheat => "set_cheat",
            Operation::ResetCheats => "reset_cheats",
            Operation::ChangeDisk => "change_disk",
            Operation::AvailableDisks => "available_disks",
            Operation::CurrentDisk => "current_disk",
            Operation::UpdateVariable => "update_variable",
            Operation::GetVariables => "get_variables",
            Operation::GetControllers => "get_controllers",
            Operation::SetControllerType => "set_controller_type",
            Operation::SetShaderConfig => "set_shader_config",
            Operation::SetFrameSpeed => "set_frame_speed",
            Operation::SetAudioEnabled => "set_audio_enabled",
            Operation::SetRumbleEnabled => "set_rumble_enabled",
            Operation::AspectRatio => "aspect_ratio",
            Operation::Input => "input",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
