use impulse_dom::{document, window, EventTarget, ListenerOptions};

/// Where a global action listens instead of on its own element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalTarget {
    Window,
    Document,
}

impl GlobalTarget {
    pub fn event_target(self) -> EventTarget {
        match self {
            GlobalTarget::Window => window().into(),
            GlobalTarget::Document => document().into(),
        }
    }
}

/// Applied to the event before the method runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `prevent`: cancel the default action.
    Prevent,
    /// `stop`: stop propagation.
    Stop,
    /// `self`: ignore events dispatched at descendants.
    SelfOnly,
}

/// A parsed `data-action` token: `event[.modifier...][@window|@document]->identifier#method`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub event_name: String,
    pub event_target: Option<GlobalTarget>,
    pub modifiers: Vec<Modifier>,
    pub options: ListenerOptions,
    pub identifier: String,
    pub method_name: String,
}

impl ActionDescriptor {
    /// Parse one token. Returns `None` when it names no event, identifier or method.
    ///
    /// Unknown modifiers and global targets are dropped.
    ///
    /// ```rust
    /// use impulse::{ActionDescriptor, GlobalTarget, Modifier};
    ///
    /// let descriptor = ActionDescriptor::parse("keydown.prevent.once@window->x-menu#close").unwrap();
    /// assert_eq!(descriptor.event_name, "keydown");
    /// assert_eq!(descriptor.event_target, Some(GlobalTarget::Window));
    /// assert_eq!(descriptor.modifiers, [Modifier::Prevent]);
    /// assert!(descriptor.options.once);
    /// assert_eq!(descriptor.identifier, "x-menu");
    /// assert_eq!(descriptor.method_name, "close");
    /// ```
    pub fn parse(descriptor: &str) -> Option<Self> {
        let (event, handler) = descriptor.trim().split_once("->")?;
        let (identifier, method_name) = handler.rsplit_once('#')?;
        if identifier.is_empty() || method_name.is_empty() {
            return None;
        }

        let (event, event_target) = match event.split_once('@') {
            Some((event, "window")) => (event, Some(GlobalTarget::Window)),
            Some((event, "document")) => (event, Some(GlobalTarget::Document)),
            Some((event, _)) => (event, None),
            None => (event, None),
        };

        let mut parts = event.split('.');
        let event_name = parts.next().filter(|name| !name.is_empty())?;
        let mut modifiers = Vec::new();
        let mut options = ListenerOptions::new();
        for part in parts {
            let modifier = match part {
                "prevent" => Modifier::Prevent,
                "stop" => Modifier::Stop,
                "self" => Modifier::SelfOnly,
                "capture" => {
                    options.capture = true;
                    continue;
                }
                "once" => {
                    options.once = true;
                    continue;
                }
                "passive" => {
                    options.passive = true;
                    continue;
                }
                _ => continue,
            };
            if !modifiers.contains(&modifier) {
                modifiers.push(modifier);
            }
        }

        Some(Self {
            event_name: event_name.to_string(),
            event_target,
            modifiers,
            options,
            identifier: identifier.to_string(),
            method_name: method_name.to_string(),
        })
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}
