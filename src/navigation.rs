use std::{
    process::{Command, ExitStatus},
    thread::JoinHandle,
};

pub trait Navigator {
    /// Replaces the current location with `url`.
    fn navigate(&mut self, url: &str);
}

/// The viewer's equivalent of the browser location bar.
pub struct PageLocation {
    href: String,
    open_with: Option<String>,
    on_change: Option<Box<dyn FnMut(&str)>>,
}

impl PageLocation {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            href: start.into(),
            open_with: None,
            on_change: None,
        }
    }

    /// Program launched with the new location as its only argument after
    /// every navigation, e.g. `xdg-open`.
    pub fn with_opener(mut self, program: Option<String>) -> Self {
        self.open_with = program;
        self
    }

    pub fn on_change(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    #[cfg(test)]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Runs the opener, if any. The returned thread waits for it to exit.
    fn open_externally(&self) -> Option<JoinHandle<Option<ExitStatus>>> {
        let program = self.open_with.as_ref()?;

        let mut child = match Command::new(program).arg(&self.href).spawn() {
            Ok(child) => child,
            Err(error) => {
                log::error!("Failed to run {} for {}: {}", program, self.href, error);
                return None;
            }
        };
        log::debug!("Handed {} to {}", self.href, program);

        let program = program.clone();
        let spawned = std::thread::Builder::new()
            .name("opener-wait".to_string())
            .spawn(move || match child.wait() {
                Ok(status) => {
                    if !status.success() {
                        log::warn!("{} exited with {}", program, status);
                    }
                    Some(status)
                }
                Err(error) => {
                    log::warn!("Failed to wait for {}: {}", program, error);
                    None
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(error) => {
                log::warn!("Failed to spawn opener wait thread: {}", error);
                None
            }
        }
    }
}

impl Navigator for PageLocation {
    fn navigate(&mut self, url: &str) {
        self.href = resolve(&self.href, url);
        log::info!("Navigated to {}", self.href);

        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&self.href);
        }

        // Detached; the thread only reaps the opener process
        let _ = self.open_externally();
    }
}

/// Resolves `target` relative to `base` the way a link on a page would be.
pub fn resolve(base: &str, target: &str) -> String {
    if has_scheme(target) {
        return target.to_string();
    }

    let without_fragment = base.split('#').next().unwrap_or_default();
    if target.is_empty() {
        return without_fragment.to_string();
    }
    if target.starts_with('#') {
        return format!("{}{}", without_fragment, target);
    }

    let base = without_fragment.split('?').next().unwrap_or_default();
    if target.starts_with('?') {
        return format!("{}{}", base, target);
    }

    if let Some(absolute_path) = target.strip_prefix('/') {
        return format!("{}/{}", origin(base), absolute_path);
    }

    match base.rfind('/') {
        Some(slash) if slash >= origin(base).len() => format!("{}{}", &base[..=slash], target),
        _ if has_scheme(base) => format!("{}/{}", origin(base), target),
        _ => target.to_string(),
    }
}

fn has_scheme(url: &str) -> bool {
    match url.find(':') {
        Some(colon) if colon > 0 => {
            let scheme = &url[..colon];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// `scheme://authority` of an absolute URL, or an empty string for paths.
fn origin(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return "";
    };

    let authority_start = scheme_end + 3;
    match url[authority_start..].find('/') {
        Some(path_start) => &url[..authority_start + path_start],
        None => url,
    }
}
