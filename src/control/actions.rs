// ============================================
// Control Actions - Действие текущего режима
// ============================================
// BOX - ничего, FILL - кусковая заливка, COPY - снятие шаблона,
// PASTE - вставка (или только подготовка рамки).

use thiserror::Error;

use crate::network::{Feedback, Notice};
use crate::region::{ChunkedFill, FillOutcome};
use crate::template::{Placement, TemplateError, TemplatePlacer, TemplateStorage, TemplateStore};
use crate::world::{BlockPos, BoundedFill, WorldAccess};

use super::{ControlState, Mode};

#[derive(Debug, Error)]
pub enum ActionError {
    /// Нулевой размер или нет материала
    #[error("region is inactive or has nothing to fill with")]
    InactiveRegion,
    #[error("no template name to copy into")]
    MissingCopyName,
    #[error("no template name to paste from")]
    MissingPasteName,
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ActionError {
    /// Во что превращается ошибка для оператора
    pub fn notice(&self) -> Notice {
        match self {
            ActionError::InactiveRegion => Notice::CannotPerformAction,
            ActionError::MissingCopyName => Notice::CannotCopy,
            ActionError::MissingPasteName => Notice::CannotPaste,
            ActionError::Template(TemplateError::InvalidName(name)) => {
                Notice::InvalidTemplateName(name.clone())
            }
            ActionError::Template(TemplateError::NotFound(name)) => Notice::UnknownTemplate(name.clone()),
            ActionError::Template(other) => Notice::StorageFailure(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Режим BOX: действия нет
    Idle,
    Filled(FillOutcome),
    Copied { name: String, size: [u32; 3] },
    Pasted { name: String, placement: Placement },
    /// Предпросмотр: размер обновлён, мир не тронут
    Prepared { name: String, placement: Placement },
}

impl ActionOutcome {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            ActionOutcome::Idle => None,
            ActionOutcome::Filled(outcome) => Some(Notice::FilledVolume(outcome.filled)),
            ActionOutcome::Copied { name, .. } => Some(Notice::CopySucceeded(name.clone())),
            ActionOutcome::Pasted { name, .. } => Some(Notice::PasteSucceeded(name.clone())),
            ActionOutcome::Prepared { name, .. } => Some(Notice::AreaPrepared(name.clone())),
        }
    }

    /// Изменился ли размер в состоянии блока
    pub fn resized(&self) -> bool {
        matches!(self, ActionOutcome::Pasted { .. } | ActionOutcome::Prepared { .. })
    }
}

/// Исполнители действий блока управления
#[derive(Debug)]
pub struct Actions<S> {
    templates: TemplateStore<S>,
    fill: ChunkedFill,
    placer: TemplatePlacer,
}

impl<S: TemplateStorage> Actions<S> {
    pub fn new(templates: TemplateStore<S>, fill: ChunkedFill) -> Self {
        Self {
            templates,
            fill,
            placer: TemplatePlacer::new(),
        }
    }

    pub fn templates(&self) -> &TemplateStore<S> {
        &self.templates
    }

    pub fn chunked_fill(&self) -> ChunkedFill {
        self.fill
    }

    /// Выполнить действие текущего режима. Ошибки заливки отдельных
    /// под-кубов уходят в `feedback` сразу, итог - в возвращаемом значении.
    pub fn perform<W>(
        &mut self,
        state: &mut ControlState,
        anchor: BlockPos,
        world: &mut W,
        preview_only: bool,
        feedback: &mut dyn Feedback,
    ) -> Result<ActionOutcome, ActionError>
    where
        W: BoundedFill + WorldAccess + ?Sized,
    {
        match state.mode {
            Mode::Box => Ok(ActionOutcome::Idle),
            Mode::Fill => {
                let region = state.region(anchor).ok_or(ActionError::InactiveRegion)?;
                let material = state.filler.as_ref().ok_or(ActionError::InactiveRegion)?;
                let outcome = self.fill.execute(region, material, world, feedback);
                log::info!(
                    "[ACTION] Fill at {}: {} blocks in {} chunks ({} failed)",
                    anchor,
                    outcome.filled,
                    outcome.chunks,
                    outcome.failures.len()
                );
                Ok(ActionOutcome::Filled(outcome))
            }
            Mode::Copy => {
                let region = state.region(anchor).ok_or(ActionError::InactiveRegion)?;
                let name = state.template_name.as_deref().ok_or(ActionError::MissingCopyName)?;
                let template = self.templates.capture(name, region, &*world)?;
                Ok(ActionOutcome::Copied {
                    name: name.to_string(),
                    size: template.size(),
                })
            }
            Mode::Paste => {
                let name = state
                    .template_name
                    .clone()
                    .ok_or(ActionError::MissingPasteName)?;
                let template = self.templates.retrieve(&name)?;
                let placement = self.placer.place(
                    world,
                    &template,
                    anchor,
                    state.offset,
                    state.transform(),
                    preview_only,
                );
                state.size = placement.size;
                if preview_only {
                    Ok(ActionOutcome::Prepared { name, placement })
                } else {
                    log::info!("[ACTION] Pasted '{}' into {}", name, placement.region);
                    Ok(ActionOutcome::Pasted { name, placement })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Material;
    use crate::template::{MemoryTemplates, Rotation};
    use crate::world::{BlockStorage, FillReport};

    fn actions() -> Actions<MemoryTemplates> {
        Actions::new(TemplateStore::new(MemoryTemplates::new()), ChunkedFill::default())
    }

    /// Считает вызовы ограниченной заливки
    #[derive(Default)]
    struct CountingWorld {
        storage: BlockStorage,
        fill_calls: usize,
    }

    impl BoundedFill for CountingWorld {
        fn fill_bounded(&mut self, min: BlockPos, max: BlockPos, material: &Material) -> FillReport {
            self.fill_calls += 1;
            self.storage.fill_bounded(min, max, material)
        }
    }

    impl WorldAccess for CountingWorld {
        fn material_at(&self, pos: BlockPos) -> Material {
            self.storage.material_at(pos)
        }

        fn set_material(&mut self, pos: BlockPos, material: &Material) -> bool {
            self.storage.set_material(pos, material)
        }
    }

    #[test]
    fn fill_with_zero_axis_is_refused_without_calls() {
        let mut world = CountingWorld::default();
        let mut state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(0, 7, 3),
            filler: Some(Material::new("stone")),
            ..ControlState::default()
        };
        let mut notices: Vec<Notice> = Vec::new();

        let err = actions()
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut notices)
            .unwrap_err();

        assert!(matches!(err, ActionError::InactiveRegion));
        assert_eq!(err.notice(), Notice::CannotPerformAction);
        assert_eq!(world.fill_calls, 0);
        assert!(notices.is_empty());
    }

    #[test]
    fn fill_without_material_is_refused() {
        let mut world = CountingWorld::default();
        let mut state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(2, 2, 2),
            filler: None,
            ..ControlState::default()
        };
        let err = actions()
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap_err();
        assert_eq!(err.notice(), Notice::CannotPerformAction);
        assert_eq!(world.fill_calls, 0);
    }

    #[test]
    fn fill_counts_blocks() {
        let mut world = CountingWorld::default();
        let mut state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(-3, 2, 2),
            offset: BlockPos::new(0, 1, 0),
            filler: Some(Material::new("cobblestone")),
            ..ControlState::default()
        };
        let outcome = actions()
            .perform(&mut state, BlockPos::new(0, 64, 0), &mut world, false, &mut Vec::<Notice>::new())
            .unwrap();

        assert_eq!(outcome.notice(), Some(Notice::FilledVolume(12)));
        assert_eq!(world.fill_calls, 1);
        assert_eq!(world.storage.material_at(BlockPos::new(-2, 66, 1)).id(), "cobblestone");
    }

    #[test]
    fn box_mode_does_nothing() {
        let mut world = CountingWorld::default();
        let mut state = ControlState {
            size: BlockPos::new(3, 3, 3),
            ..ControlState::default()
        };
        let outcome = actions()
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap();
        assert_eq!(outcome, ActionOutcome::Idle);
        assert_eq!(outcome.notice(), None);
    }

    #[test]
    fn copy_requires_name_and_region() {
        let mut world = CountingWorld::default();
        let mut actions = actions();
        let mut state = ControlState {
            mode: Mode::Copy,
            size: BlockPos::new(2, 2, 2),
            ..ControlState::default()
        };
        let err = actions
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap_err();
        assert_eq!(err.notice(), Notice::CannotCopy);

        state.template_name = Some("bad/name".into());
        let err = actions
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap_err();
        assert_eq!(err.notice(), Notice::InvalidTemplateName("bad/name".into()));

        state.size = BlockPos::new(2, 0, 2);
        let err = actions
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap_err();
        assert_eq!(err.notice(), Notice::CannotPerformAction);
    }

    #[test]
    fn paste_unknown_template_keeps_size() {
        let mut world = CountingWorld::default();
        let mut state = ControlState {
            mode: Mode::Paste,
            size: BlockPos::new(4, 4, 4),
            template_name: Some("missing".into()),
            ..ControlState::default()
        };
        let err = actions()
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap_err();
        assert_eq!(err.notice(), Notice::UnknownTemplate("missing".into()));
        assert_eq!(state.size, BlockPos::new(4, 4, 4));
        assert_eq!(world.storage.block_count(), 0);

        state.template_name = None;
        let err = actions()
            .perform(&mut state, BlockPos::ZERO, &mut world, false, &mut Vec::<Notice>::new())
            .unwrap_err();
        assert_eq!(err.notice(), Notice::CannotPaste);
    }

    #[test]
    fn copy_then_paste_and_preview() {
        let mut world = CountingWorld::default();
        let mut actions = actions();
        let stone = Material::new("stone");
        world.set_material(BlockPos::new(1, 64, 1), &stone);

        let mut copier = ControlState {
            mode: Mode::Copy,
            size: BlockPos::new(5, 5, 5),
            offset: BlockPos::new(1, 0, 1),
            template_name: Some("house".into()),
            ..ControlState::default()
        };
        let copied = actions
            .perform(&mut copier, BlockPos::new(0, 64, 0), &mut world, false, &mut Vec::<Notice>::new())
            .unwrap();
        assert_eq!(copied.notice(), Some(Notice::CopySucceeded("house".into())));

        let mut paster = ControlState {
            mode: Mode::Paste,
            template_name: Some("house".into()),
            rotation: Rotation::Clockwise90,
            ..ControlState::default()
        };
        let prepared = actions
            .perform(&mut paster, BlockPos::new(100, 64, 0), &mut world, true, &mut Vec::<Notice>::new())
            .unwrap();
        assert_eq!(prepared.notice(), Some(Notice::AreaPrepared("house".into())));
        assert!(prepared.resized());
        assert_eq!(paster.size, BlockPos::new(-5, 5, 5));
        assert!(world.material_at(BlockPos::new(100, 64, 0)).is_air());

        let pasted = actions
            .perform(&mut paster, BlockPos::new(100, 64, 0), &mut world, false, &mut Vec::<Notice>::new())
            .unwrap();
        assert_eq!(pasted.notice(), Some(Notice::PasteSucceeded("house".into())));
        assert_eq!(world.material_at(BlockPos::new(100, 64, 0)), stone);
        let region = paster.region(BlockPos::new(100, 64, 0)).unwrap();
        assert_eq!(region.lengths(), [5, 5, 5]);
        assert!(region.contains(BlockPos::new(96, 68, 4)));
    }
}
