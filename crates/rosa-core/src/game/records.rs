//! Record layouts of the host's static arrays
//!
//! Every struct here mirrors one element of a host-owned array in the
//! supported host build. Field order and types must match the host exactly;
//! nothing in this crate ever allocates these arrays itself.
//!
//! Cross-references between records are stored as small integer indices with
//! [`NO_REFERENCE`](crate::memory::layout::NO_REFERENCE) meaning "none".

use std::ffi::c_char;

use bytemuck::Zeroable;

use super::{RotMatrix, Vector};
use crate::memory::layout::{account, human, item, item_type, player, street};

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Connection {
    /// IPv4 address, most significant octet first
    pub address: u32,
    pub port: u32,
    pub player_id: i32,
    pub admin_visible: i32,
    pub spectating_human_id: i32,
    pub timeout_time: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Account {
    /// Zero marks the end of the densely packed account list
    pub sub_rosa_id: i32,
    pub phone_number: i32,
    pub money: i32,
    pub corporate_rating: i32,
    pub criminal_rating: i32,
    pub spawn_timer: i32,
    pub play_time: i32,
    pub ban_time: i32,
    pub name: [c_char; account::NAME_LEN],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Action {
    pub kind: i32,
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct MenuButton {
    pub id: i32,
    pub text: [c_char; 64],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Player {
    pub active: i32,
    pub name: [c_char; player::NAME_LEN],
    pub sub_rosa_id: i32,
    pub phone_number: i32,
    pub is_admin: i32,
    pub account_id: i32,
    pub is_ready: i32,
    pub money: i32,
    pub corporate_rating: i32,
    pub criminal_rating: i32,
    pub team: i32,
    pub team_switch_timer: i32,
    pub stocks: i32,
    pub spawn_timer: i32,
    pub human_id: i32,
    pub menu_tab: i32,
    pub num_actions: i32,
    pub last_num_actions: i32,
    pub actions: [Action; player::ACTIONS],
    pub num_menu_buttons: i32,
    pub menu_buttons: [MenuButton; player::MENU_BUTTONS],
    pub is_bot: i32,
    pub bot_has_destination: i32,
    pub bot_destination: Vector,
    pub gender: i32,
    pub skin_color: i32,
    pub hair_color: i32,
    pub hair: i32,
    pub eye_color: i32,
    pub model: i32,
    pub suit_color: i32,
    pub tie_color: i32,
    pub head: i32,
    pub necklace: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Bone {
    pub body_id: i32,
    pub pos: Vector,
    pub pos2: Vector,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Human {
    pub active: i32,
    pub physics_sim: i32,
    pub player_id: i32,
    pub account_id: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub vehicle_id: i32,
    pub vehicle_seat: i32,
    pub despawn_time: i32,
    pub oxygen: i32,
    pub is_immortal: i32,
    pub health: i32,
    pub blood_level: i32,
    pub is_bleeding: i32,
    pub chest_hp: i32,
    pub head_hp: i32,
    pub left_arm_hp: i32,
    pub right_arm_hp: i32,
    pub left_leg_hp: i32,
    pub right_leg_hp: i32,
    pub pos: Vector,
    pub view_yaw: f32,
    pub view_pitch: f32,
    pub bones: [Bone; human::BONES],
    pub right_hand_occupied: i32,
    pub right_hand_item_id: i32,
    pub left_hand_occupied: i32,
    pub left_hand_item_id: i32,
    pub is_grabbing_right: i32,
    pub grabbing_right_human_id: i32,
    pub grabbing_right_bone: i32,
    pub is_grabbing_left: i32,
    pub grabbing_left_human_id: i32,
    pub grabbing_left_bone: i32,
    pub gender: i32,
    pub model: i32,
    pub input_flags: u32,
    pub last_input_flags: u32,
    pub walk_input: f32,
    pub strafe_input: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct ItemType {
    pub price: i32,
    pub mass: f32,
    pub is_gun: i32,
    pub fire_rate: i32,
    pub bullet_type: i32,
    pub magazine_ammo: i32,
    pub bullet_velocity: f32,
    pub bullet_spread: f32,
    pub num_hands: i32,
    pub right_hand_pos: Vector,
    pub left_hand_pos: Vector,
    pub bounding_box: Vector,
    pub name: [c_char; item_type::NAME_LEN],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Item {
    pub active: i32,
    pub has_physics: i32,
    pub physics_settled: i32,
    pub is_static: i32,
    pub type_id: i32,
    pub despawn_time: i32,
    pub grenade_primer_id: i32,
    pub parent_human_id: i32,
    pub parent_item_id: i32,
    pub parent_slot: i32,
    pub body_id: i32,
    pub pos: Vector,
    pub vel: Vector,
    pub rot: RotMatrix,
    pub bullets: i32,
    pub cooldown: i32,
    pub cash_spread: i32,
    pub cash_bill_amount: i32,
    pub cash_pure_value: i32,
    pub phone_number: i32,
    pub display_phone_number: i32,
    pub entered_phone_number: i32,
    pub computer_current_line: i32,
    pub computer_top_line: i32,
    pub computer_cursor: i32,
    pub computer_lines: [[c_char; item::COMPUTER_LINE_LEN]; item::COMPUTER_LINES],
    pub computer_line_colors: [[u8; item::COMPUTER_LINE_LEN]; item::COMPUTER_LINES],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Vehicle {
    pub active: i32,
    pub type_id: i32,
    pub is_locked: i32,
    pub controllable_state: i32,
    pub health: i32,
    pub color: i32,
    pub last_driver_player_id: i32,
    pub body_id: i32,
    pub pos: Vector,
    pub vel: Vector,
    pub rot: RotMatrix,
    pub gear: f32,
    pub steer_control: f32,
    pub gas_control: f32,
    pub brake_control: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Bullet {
    pub kind: i32,
    pub time: i32,
    pub player_id: i32,
    pub pos: Vector,
    pub vel: Vector,
    pub last_pos: Vector,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct RigidBody {
    pub active: i32,
    pub kind: i32,
    pub settled: i32,
    pub mass: f32,
    pub pos: Vector,
    pub vel: Vector,
    pub rot: RotMatrix,
    pub rot_vel: RotMatrix,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Bond {
    pub active: i32,
    pub kind: i32,
    pub despawn_time: i32,
    pub global_pos: Vector,
    pub local_pos: Vector,
    pub other_local_pos: Vector,
    pub body_id: i32,
    pub other_body_id: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct StreetLane {
    pub direction: i32,
    pub pos_a: Vector,
    pub pos_b: Vector,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct Street {
    pub name: [c_char; street::NAME_LEN],
    pub intersection_a: i32,
    pub intersection_b: i32,
    pub num_lanes: i32,
    pub lanes: [StreetLane; street::LANES],
    pub traffic_cuboid_a: Vector,
    pub traffic_cuboid_b: Vector,
    pub num_traffic_cars: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct StreetIntersection {
    pub pos: Vector,
    pub street_east: i32,
    pub street_south: i32,
    pub street_west: i32,
    pub street_north: i32,
    pub light_east: i32,
    pub light_south: i32,
    pub light_west: i32,
    pub light_north: i32,
    pub lights_timer: i32,
    pub lights_state: i32,
}

/// Out-parameter block the host fills after a successful line intersection
#[repr(C)]
#[derive(Debug, Clone, Copy, Zeroable)]
pub struct LineIntersectResult {
    pub pos: Vector,
    pub normal: Vector,
    pub fraction: f32,
    pub human_bone: i32,
    pub vehicle_face: i32,
}

/// Read a fixed-size, NUL-padded host string
pub fn read_fixed_str(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Write into a fixed-size host string, truncating and always NUL-terminating
pub fn write_fixed_str(buf: &mut [c_char], value: &str) {
    let Some(max) = buf.len().checked_sub(1) else {
        return;
    };
    let len = value.len().min(max);
    for (dst, &src) in buf.iter_mut().zip(&value.as_bytes()[..len]) {
        *dst = src as c_char;
    }
    for dst in &mut buf[len..] {
        *dst = 0;
    }
}
