// ============================================
// Dispatcher - Применение сообщений клиента
// ============================================
// Работает только в логическом потоке сервера: одно сообщение
// за раз, действие выполняется до конца.

use crate::blocks::Material;
use crate::control::{ActionError, ActionOutcome, Actions};
use crate::region::{ChunkedFill, FillOutcome, Measurement, Region};
use crate::template::{TemplateStorage, TemplateStore};
use crate::world::{BlockPos, ObjectTypes, World, WorldError, CONTROL_BLOCK};

use super::{ClientMessage, CommandMessage, Feedback, Notice};

/// Что произошло с сообщением
#[derive(Debug)]
pub enum Dispatch {
    /// Адресат не найден или сообщение не для ядра
    Ignored,
    /// Состояние применено, действие не запрашивалось
    Applied,
    Performed(Result<ActionOutcome, ActionError>),
    Measured(Measurement),
    Filled(FillOutcome),
    Placed(Result<(), WorldError>),
    Removed(bool),
}

pub struct Dispatcher<S> {
    actions: Actions<S>,
    types: &'static ObjectTypes,
}

impl<S: TemplateStorage> Dispatcher<S> {
    pub fn new(templates: TemplateStore<S>, fill: ChunkedFill, types: &'static ObjectTypes) -> Self {
        Self {
            actions: Actions::new(templates, fill),
            types,
        }
    }

    pub fn actions(&self) -> &Actions<S> {
        &self.actions
    }

    /// Разобрать сообщение клиента. Hello обрабатывает сервер
    pub fn handle(&mut self, world: &mut World, message: ClientMessage, feedback: &mut dyn Feedback) -> Dispatch {
        match message {
            ClientMessage::Hello { .. } => Dispatch::Ignored,
            ClientMessage::ControlSync(command) => self.handle_command(world, command, feedback),
            ClientMessage::Measure { first, second } => Dispatch::Measured(self.measure(first, second, feedback)),
            ClientMessage::WandFill { first, second, material } => {
                Dispatch::Filled(self.wand_fill(world, first, second, &material, feedback))
            }
            ClientMessage::PlaceControl { pos } => {
                let result = world.place_object(self.types, CONTROL_BLOCK, pos);
                if let Err(e) = &result {
                    log::debug!("[DISPATCH] Cannot place control at {}: {}", pos, e);
                }
                Dispatch::Placed(result)
            }
            ClientMessage::RemoveControl { pos } => Dispatch::Removed(world.remove_object(pos).is_some()),
        }
    }

    /// Применить снимок к блоку управления и, если просили, выполнить действие
    pub fn handle_command(
        &mut self,
        world: &mut World,
        command: CommandMessage,
        feedback: &mut dyn Feedback,
    ) -> Dispatch {
        let CommandMessage {
            anchor,
            state: incoming,
            perform_action,
            preview_only,
        } = command;

        let Some((state, blocks)) = world.control_parts_mut(anchor) else {
            log::debug!("[DISPATCH] No control object at {}, ignoring", anchor);
            return Dispatch::Ignored;
        };
        state.apply(incoming);

        let dispatch = if perform_action {
            let result = self.actions.perform(state, anchor, blocks, preview_only, feedback);
            match &result {
                Ok(outcome) => {
                    if let Some(notice) = outcome.notice() {
                        feedback.notify(notice);
                    }
                }
                Err(e) => {
                    log::debug!("[DISPATCH] Action at {} refused: {}", anchor, e);
                    feedback.notify(e.notice());
                }
            }
            Dispatch::Performed(result)
        } else {
            Dispatch::Applied
        };

        world.mark_object_dirty(anchor);
        dispatch
    }

    /// Линейка: отчёт о регионе между двумя точками
    pub fn measure(&self, first: BlockPos, second: BlockPos, feedback: &mut dyn Feedback) -> Measurement {
        let measurement = Measurement::between(first, second);
        for line in measurement.lines() {
            feedback.notify(Notice::Measurement(line));
        }
        measurement
    }

    /// Заливка между двумя углами (жезл)
    pub fn wand_fill(
        &self,
        world: &mut World,
        first: BlockPos,
        second: BlockPos,
        material: &Material,
        feedback: &mut dyn Feedback,
    ) -> FillOutcome {
        let region = Region::new(first, second);
        let outcome = self
            .actions
            .chunked_fill()
            .execute(region, material, &mut world.blocks, feedback);
        feedback.notify(Notice::FilledVolume(outcome.filled));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlState, Mode};
    use crate::template::{MemoryTemplates, Rotation};
    use crate::world::{object_types, WorldAccess};

    fn dispatcher() -> Dispatcher<MemoryTemplates> {
        Dispatcher::new(
            TemplateStore::new(MemoryTemplates::new()),
            ChunkedFill::default(),
            object_types(),
        )
    }

    fn world_with_control(anchor: BlockPos) -> World {
        let mut world = World::default();
        world.place_object(object_types(), CONTROL_BLOCK, anchor).unwrap();
        world.take_dirty_objects();
        world
    }

    fn command(anchor: BlockPos, state: ControlState, perform_action: bool) -> CommandMessage {
        CommandMessage {
            anchor,
            state,
            perform_action,
            preview_only: false,
        }
    }

    #[test]
    fn fill_with_zero_axis_reports_cannot_perform() {
        let anchor = BlockPos::new(0, 64, 0);
        let mut world = world_with_control(anchor);
        let blocks_before = world.blocks.block_count();
        let mut notices: Vec<Notice> = Vec::new();

        let state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(0, 7, 3),
            filler: Some(Material::new("stone")),
            ..ControlState::default()
        };
        let dispatch = dispatcher().handle_command(&mut world, command(anchor, state, true), &mut notices);

        assert!(matches!(dispatch, Dispatch::Performed(Err(ActionError::InactiveRegion))));
        assert_eq!(notices, vec![Notice::CannotPerformAction]);
        assert_eq!(world.blocks.block_count(), blocks_before);
        assert_eq!(world.blocks.version(), 1);
    }

    #[test]
    fn paste_of_missing_template_keeps_size() {
        let anchor = BlockPos::new(0, 64, 0);
        let mut world = world_with_control(anchor);
        let mut notices: Vec<Notice> = Vec::new();

        let state = ControlState {
            mode: Mode::Paste,
            size: BlockPos::new(2, 3, 4),
            template_name: Some("missing".into()),
            ..ControlState::default()
        };
        dispatcher().handle_command(&mut world, command(anchor, state, true), &mut notices);

        assert_eq!(notices, vec![Notice::UnknownTemplate("missing".into())]);
        assert_eq!(world.control(anchor).map(|s| s.size), Some(BlockPos::new(2, 3, 4)));
        assert_eq!(world.blocks.block_count(), 1);
    }

    #[test]
    fn captured_house_is_placed_with_same_size() {
        let source = BlockPos::new(0, 64, 0);
        let target = BlockPos::new(50, 64, 50);
        let mut world = World::default();
        world.place_object(object_types(), CONTROL_BLOCK, source).unwrap();
        world.place_object(object_types(), CONTROL_BLOCK, target).unwrap();
        for y in 65..70 {
            world.blocks.set_material(BlockPos::new(1, y, 1), &Material::new("oak_planks"));
        }
        let mut dispatcher = dispatcher();
        let mut notices: Vec<Notice> = Vec::new();

        let copy = ControlState {
            mode: Mode::Copy,
            size: BlockPos::new(5, 5, 5),
            offset: BlockPos::new(0, 1, 0),
            template_name: Some("house".into()),
            ..ControlState::default()
        };
        dispatcher.handle_command(&mut world, command(source, copy, true), &mut notices);

        let paste = ControlState {
            mode: Mode::Paste,
            offset: BlockPos::new(0, 1, 0),
            template_name: Some("house".into()),
            rotation: Rotation::None,
            ..ControlState::default()
        };
        dispatcher.handle_command(&mut world, command(target, paste, true), &mut notices);

        assert_eq!(
            notices,
            vec![
                Notice::CopySucceeded("house".into()),
                Notice::PasteSucceeded("house".into())
            ]
        );
        let placed = world.control(target).unwrap();
        assert_eq!(placed.size, BlockPos::new(5, 5, 5));
        assert_eq!(placed.region(target).unwrap().lengths(), [5, 5, 5]);
        assert_eq!(world.blocks.material_at(BlockPos::new(51, 69, 51)).id(), "oak_planks");
        assert_eq!(world.take_dirty_objects(), vec![source, target]);
    }

    #[test]
    fn missing_anchor_is_ignored() {
        let mut world = World::default();
        let mut notices: Vec<Notice> = Vec::new();
        let state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(2, 2, 2),
            ..ControlState::default()
        };
        let dispatch = dispatcher().handle_command(&mut world, command(BlockPos::ZERO, state, true), &mut notices);
        assert!(matches!(dispatch, Dispatch::Ignored));
        assert!(notices.is_empty());
        assert_eq!(world.blocks.block_count(), 0);
    }

    #[test]
    fn state_update_without_action() {
        let anchor = BlockPos::new(3, 64, 3);
        let mut world = world_with_control(anchor);
        let mut notices: Vec<Notice> = Vec::new();
        let state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(2, 2, 2),
            filler: Some(Material::new("glass")),
            ..ControlState::default()
        };

        let dispatch = dispatcher().handle_command(&mut world, command(anchor, state.clone(), false), &mut notices);

        assert!(matches!(dispatch, Dispatch::Applied));
        assert!(notices.is_empty());
        assert_eq!(world.control(anchor), Some(&state));
        assert_eq!(world.blocks.block_count(), 1);
        assert_eq!(world.take_dirty_objects(), vec![anchor]);
    }

    #[test]
    fn fill_failures_are_reported_per_chunk() {
        let anchor = BlockPos::new(0, 300, 0);
        let mut world = world_with_control(anchor);
        let mut notices: Vec<Notice> = Vec::new();
        // верхняя половина выходит за потолок мира (319)
        let state = ControlState {
            mode: Mode::Fill,
            size: BlockPos::new(2, 40, 2),
            offset: BlockPos::new(1, -12, 0),
            filler: Some(Material::new("stone")),
            ..ControlState::default()
        };
        let mut dispatcher = Dispatcher::new(
            TemplateStore::new(MemoryTemplates::new()),
            ChunkedFill::new(16),
            object_types(),
        );

        dispatcher.handle_command(&mut world, command(anchor, state, true), &mut notices);

        assert_eq!(
            notices,
            vec![
                Notice::FillError("Cannot place blocks outside of the world".into()),
                Notice::FilledVolume(2 * 32 * 2),
            ]
        );
    }

    #[test]
    fn measure_and_wand_fill() {
        let mut world = World::default();
        let mut notices: Vec<Notice> = Vec::new();
        let mut dispatcher = dispatcher();

        dispatcher.handle(
            &mut world,
            ClientMessage::Measure {
                first: BlockPos::new(0, 0, 0),
                second: BlockPos::new(2, 0, 4),
            },
            &mut notices,
        );
        assert_eq!(
            notices,
            vec![
                Notice::Measurement("Size: 3 x 1 x 5".into()),
                Notice::Measurement("Area: 15".into()),
                Notice::Measurement("Volume: 15".into()),
            ]
        );

        notices.clear();
        let dispatch = dispatcher.handle(
            &mut world,
            ClientMessage::WandFill {
                first: BlockPos::new(0, 64, 0),
                second: BlockPos::new(-3, 65, 2),
                material: Material::new("sand"),
            },
            &mut notices,
        );
        assert!(matches!(dispatch, Dispatch::Filled(ref o) if o.filled == 24));
        assert_eq!(notices, vec![Notice::FilledVolume(24)]);
    }

    #[test]
    fn place_and_remove_controls() {
        let mut world = World::default();
        let mut dispatcher = dispatcher();
        let pos = BlockPos::new(7, 64, 7);
        let mut notices: Vec<Notice> = Vec::new();

        let placed = dispatcher.handle(&mut world, ClientMessage::PlaceControl { pos }, &mut notices);
        assert!(matches!(placed, Dispatch::Placed(Ok(()))));
        let again = dispatcher.handle(&mut world, ClientMessage::PlaceControl { pos }, &mut notices);
        assert!(matches!(again, Dispatch::Placed(Err(WorldError::Occupied(_)))));

        let removed = dispatcher.handle(&mut world, ClientMessage::RemoveControl { pos }, &mut notices);
        assert!(matches!(removed, Dispatch::Removed(true)));
        assert!(world.control(pos).is_none());
    }
}
