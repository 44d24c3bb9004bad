//! Voice Context - 音色选择与语速

mod catalog;
mod value_objects;

pub use catalog::{default_voice, rank_voices, VoiceInfo};
pub use value_objects::{
    device_rate, utterance_spacing, RateDescriptor, Speed, VoiceSelection, REMOTE_VOICE_PREFIX,
};
