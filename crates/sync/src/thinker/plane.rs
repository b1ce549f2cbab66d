use crate::fixed::Fixed;
use crate::world::Sector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Floor,
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneResult {
    Moved,
    Crushed,
    PastDest,
}

/// Moves one plane of `sector` toward `dest`. Crushing only considers the
/// opposite plane; actors are the game layer's concern.
pub fn move_plane(
    sector: &mut Sector,
    plane: Plane,
    speed: Fixed,
    dest: Fixed,
    crush: bool,
    direction: i32,
) -> PlaneResult {
    match (plane, direction.signum()) {
        (Plane::Floor, -1) => {
            if sector.floor_height.saturating_sub(speed) < dest {
                sector.floor_height = dest;
                PlaneResult::PastDest
            } else {
                sector.floor_height = sector.floor_height.saturating_sub(speed);
                PlaneResult::Moved
            }
        }
        (Plane::Floor, 1) => {
            if sector.floor_height.saturating_add(speed) > dest {
                sector.floor_height = dest;
                return PlaneResult::PastDest;
            }
            let next = sector.floor_height.saturating_add(speed);
            if next > sector.ceiling_height {
                if crush {
                    sector.floor_height = next;
                }
                return PlaneResult::Crushed;
            }
            sector.floor_height = next;
            PlaneResult::Moved
        }
        (Plane::Ceiling, -1) => {
            if sector.ceiling_height.saturating_sub(speed) < dest {
                sector.ceiling_height = dest;
                return PlaneResult::PastDest;
            }
            let next = sector.ceiling_height.saturating_sub(speed);
            if next < sector.floor_height {
                if crush {
                    sector.ceiling_height = next;
                }
                return PlaneResult::Crushed;
            }
            sector.ceiling_height = next;
            PlaneResult::Moved
        }
        (Plane::Ceiling, 1) => {
            if sector.ceiling_height.saturating_add(speed) > dest {
                sector.ceiling_height = dest;
                PlaneResult::PastDest
            } else {
                sector.ceiling_height = sector.ceiling_height.saturating_add(speed);
                PlaneResult::Moved
            }
        }
        _ => PlaneResult::Moved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{FRACUNIT, from_int};

    #[test]
    fn floor_reaches_destination() {
        let mut sector = Sector::new(0, from_int(128));
        let mut result = PlaneResult::Moved;
        let mut steps = 0;
        while result != PlaneResult::PastDest {
            result = move_plane(&mut sector, Plane::Floor, FRACUNIT, from_int(4) + 1, false, 1);
            steps += 1;
        }
        assert_eq!(sector.floor_height, from_int(4) + 1);
        assert_eq!(steps, 5);
    }

    #[test]
    fn ceiling_blocked_without_crush() {
        let mut sector = Sector::new(from_int(10), from_int(11));
        let result = move_plane(&mut sector, Plane::Ceiling, from_int(2), 0, false, -1);
        assert_eq!(result, PlaneResult::Crushed);
        assert_eq!(sector.ceiling_height, from_int(11));

        let result = move_plane(&mut sector, Plane::Ceiling, from_int(2), 0, true, -1);
        assert_eq!(result, PlaneResult::Crushed);
        assert_eq!(sector.ceiling_height, from_int(9));
    }
}
