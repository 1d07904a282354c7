use crate::physics_world::PhysicsWorld;
use crate::world::{Entity, EntityFlags, EntityId, Rect, Vec2};

/// Camera in world units. `position` is the top-left of the visible area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub viewport: Vec2,
    pub follow: Option<EntityId>,
}

impl Camera2D {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            position: Vec2::ZERO,
            viewport,
            follow: None,
        }
    }

    pub fn following(mut self, id: EntityId) -> Self {
        self.follow = Some(id);
        self
    }

    pub fn rect(&self) -> Rect {
        view_rect(self.position, self.viewport)
    }

    /// Top-left offset that centres `focus`, held inside the tilemap and kept
    /// from crossing camera blockers. Without a live followed entity the
    /// offset is returned unclamped.
    pub fn clamped_offset(&self, world: &PhysicsWorld, focus: Vec2) -> Vec2 {
        let mut offset = focus - self.viewport * 0.5;
        let Some(followed) = self.follow.and_then(|id| world.entities().peek(id)) else {
            return offset;
        };

        if let Some(tilemap) = world.tilemap() {
            offset.x = clamp_to_extent(offset.x, self.viewport.x, tilemap.width() as f32);
            offset.y = clamp_to_extent(offset.y, self.viewport.y, tilemap.height() as f32);
        }

        let followed_center = followed.collider.center();
        for blocker in world.entities().iter() {
            if blocker.id == followed.id {
                continue;
            }
            if blocker.flags.contains(EntityFlags::BLOCKS_CAMERA_X) {
                offset.x = block_x(offset, self.viewport, blocker, followed_center.x);
            }
            if blocker.flags.contains(EntityFlags::BLOCKS_CAMERA_Y) {
                offset.y = block_y(offset, self.viewport, blocker, followed_center.y);
            }
        }
        offset
    }

    /// Recentres on the followed entity. A dead or missing target leaves the
    /// camera where it is.
    pub fn update(&mut self, world: &PhysicsWorld) {
        let Some(focus) = self
            .follow
            .and_then(|id| world.entities().peek(id))
            .map(|entity| entity.collider.center())
        else {
            return;
        };
        self.position = self.clamped_offset(world, focus);
    }
}

fn view_rect(offset: Vec2, viewport: Vec2) -> Rect {
    Rect::new(offset.x, offset.y, viewport.x, viewport.y)
}

/// A viewport larger than the map is centred on it instead.
fn clamp_to_extent(offset: f32, view: f32, extent: f32) -> f32 {
    if view >= extent {
        (extent - view) * 0.5
    } else {
        offset.clamp(0.0, extent - view)
    }
}

fn block_x(offset: Vec2, viewport: Vec2, blocker: &Entity, followed_x: f32) -> f32 {
    let wall = blocker.collider;
    if !view_rect(offset, viewport).intersects(&wall) {
        return offset.x;
    }
    if followed_x < wall.center().x {
        offset.x.min(wall.left() - viewport.x)
    } else {
        offset.x.max(wall.right())
    }
}

fn block_y(offset: Vec2, viewport: Vec2, blocker: &Entity, followed_y: f32) -> f32 {
    let wall = blocker.collider;
    if !view_rect(offset, viewport).intersects(&wall) {
        return offset.y;
    }
    if followed_y < wall.center().y {
        offset.y.min(wall.top() - viewport.y)
    } else {
        offset.y.max(wall.bottom())
    }
}
