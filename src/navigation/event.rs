use std::fmt;
use std::sync::Arc;

use super::navigator::NavigatorHandle;
use crate::models::Location;

#[derive(Debug, Clone)]
pub enum NavigationEvent {
    Forward(ForwardEvent),
    Back(BackEvent),
    AppExit(AppExitEvent),
}

#[derive(Clone)]
pub struct ForwardEvent {
    pub sender: Arc<str>,
    pub last_location: Option<Location>,
    pub current_location: Location,
    pub clear_top: bool,
    pub cleared_top_to_location: Option<Location>,
    pub navigator: NavigatorHandle,
}

#[derive(Clone)]
pub struct BackEvent {
    pub sender: Arc<str>,
    pub last_location: Location,
    pub current_location: Option<Location>,
    pub fast_rewind: bool,
    pub navigator: NavigatorHandle,
}

#[derive(Debug, Clone)]
pub struct AppExitEvent {
    pub sender: Arc<str>,
}

impl NavigationEvent {
    pub fn sender(&self) -> &str {
        match self {
            NavigationEvent::Forward(e) => &e.sender,
            NavigationEvent::Back(e) => &e.sender,
            NavigationEvent::AppExit(e) => &e.sender,
        }
    }

    pub fn navigator(&self) -> Option<&NavigatorHandle> {
        match self {
            NavigationEvent::Forward(e) => Some(&e.navigator),
            NavigationEvent::Back(e) => Some(&e.navigator),
            NavigationEvent::AppExit(_) => None,
        }
    }

    pub fn current_location(&self) -> Option<&Location> {
        match self {
            NavigationEvent::Forward(e) => Some(&e.current_location),
            NavigationEvent::Back(e) => e.current_location.as_ref(),
            NavigationEvent::AppExit(_) => None,
        }
    }

    pub fn as_forward(&self) -> Option<&ForwardEvent> {
        match self {
            NavigationEvent::Forward(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_back(&self) -> Option<&BackEvent> {
        match self {
            NavigationEvent::Back(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_app_exit(&self) -> bool {
        matches!(self, NavigationEvent::AppExit(_))
    }
}

impl fmt::Debug for ForwardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardEvent")
            .field("sender", &self.sender)
            .field("last", &self.last_location.as_ref().and_then(Location::id))
            .field("current", &self.current_location.id())
            .field("clear_top", &self.clear_top)
            .field(
                "cleared_to",
                &self.cleared_top_to_location.as_ref().and_then(Location::id),
            )
            .finish()
    }
}

impl fmt::Debug for BackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackEvent")
            .field("sender", &self.sender)
            .field("last", &self.last_location.id())
            .field("current", &self.current_location.as_ref().and_then(Location::id))
            .field("fast_rewind", &self.fast_rewind)
            .finish()
    }
}
