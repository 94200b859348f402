use crate::config::AppConfig;
use crate::controls::ControlPanel;
use crate::render::RenderSurface;
use crate::resources::ResourceLedger;
use crate::scene::Generation;

/// Everything a scene may touch outside its own graph.
///
/// Passed explicitly into every lifecycle call; there is no global state.
/// The host owns exactly one context for the lifetime of the application.
pub struct AppContext {
    pub surface: Box<dyn RenderSurface>,
    pub controls: ControlPanel,
    pub config: AppConfig,
    last_generation: Option<Generation>,
    verse: Option<usize>,
}

impl AppContext {
    pub fn new(surface: impl RenderSurface + 'static, config: AppConfig) -> Self {
        Self {
            surface: Box::new(surface),
            controls: ControlPanel::new(),
            config,
            last_generation: None,
            verse: None,
        }
    }

    /// Hand out the generation for a scene instance about to initialise.
    /// Never repeats a generation already issued by this context.
    pub fn next_generation(&mut self) -> Generation {
        let generation = match self.last_generation {
            Some(last) => last.next(),
            None => Generation::FIRST,
        };
        self.last_generation = Some(generation);
        generation
    }

    /// Index of the displayed verse in the host's navigation order.
    pub fn current_verse(&self) -> Option<usize> {
        self.verse
    }

    pub(crate) fn set_verse(&mut self, verse: Option<usize>) {
        self.verse = verse;
    }

    /// Send a ledger's queued upload and release commands to the surface.
    pub fn forward(&mut self, ledger: &mut ResourceLedger) -> usize {
        let mut sent = 0;
        for command in ledger.drain_commands() {
            self.surface.apply(command);
            sent += 1;
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{HeadlessSurface, ResourceKind, Shape};

    #[test]
    fn generations_are_unique_per_context() {
        let mut app = AppContext::new(HeadlessSurface::new(), AppConfig::default());
        let a = app.next_generation();
        let b = app.next_generation();
        assert_eq!(a, Generation::FIRST);
        assert_ne!(a, b);
    }

    #[test]
    fn forward_drains_the_ledger() {
        let surface = HeadlessSurface::new();
        let stats = surface.stats();
        let mut app = AppContext::new(surface, AppConfig::default());
        let mut ledger = ResourceLedger::new(app.next_generation());
        let id = ledger.allocate(ResourceKind::Geometry(Shape::Ring));
        ledger.release(id);

        assert_eq!(app.forward(&mut ledger), 2);
        assert_eq!(app.forward(&mut ledger), 0);
        let stats = stats.borrow();
        assert_eq!(stats.uploads, 1);
        assert_eq!(stats.releases, 1);
        assert!(stats.live.is_empty());
    }
}
