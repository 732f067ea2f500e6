//! Actor words
//!
//! Every actor starts with the same six words: header, id, three axis words
//! and the status word. Players, items and bullets append their own extras.
//! All shifts and widths come from `meshfire_core::layout`.

use crate::error::{Error, Result};
use crate::words::{pack, WordReader, WordWriter};
use meshfire_core::actor::{BulletData, ItemData, PlayerData, WeaponSlot};
use meshfire_core::layout::{
    AXIS_POS, AXIS_VEL, HDR_ANIM0, HDR_HP, HDR_LIFETIME, HDR_SUBTYPE, HDR_TYPE, HDR_WEAPON,
    SLOT_AMMO, SLOT_AMMO2, SLOT_RELOAD, SLOT_RELOAD2, SLOT_WEAPON2, ST_ANIM_HIT, ST_DAMAGE,
    ST_DETUNE, ST_MAGS, ST_SP, ST_TRIG, VEL_BIAS,
};
use meshfire_core::{Actor, ActorKind, ActorType};

/// Words used by an actor of the given type
pub fn actor_words(actor_type: ActorType) -> usize {
    6 + match actor_type {
        ActorType::Player => 3,
        ActorType::Item | ActorType::Bullet => 1,
        ActorType::Barrel | ActorType::Tree => 0,
    }
}

fn axis_word(pos: i32, vel: i32) -> u32 {
    let w = pack(0, AXIS_VEL, (vel + VEL_BIAS) as u32);
    pack(w, AXIS_POS, pos as u32)
}

fn read_axis(word: u32) -> (i32, i32) {
    let vel = AXIS_VEL.get(word) as i32 - VEL_BIAS;
    (AXIS_POS.get(word) as i32, vel)
}

/// Append one quantized actor
pub fn encode_actor(w: &mut WordWriter, a: &Actor) {
    let mut header = pack(0, HDR_TYPE, a.actor_type().tag());
    header = pack(header, HDR_SUBTYPE, a.subtype as u32);
    header = pack(header, HDR_WEAPON, a.header_weapon() as u32);
    header = pack(header, HDR_LIFETIME, a.lifetime as u32);
    header = pack(header, HDR_ANIM0, a.anim0 as u32);
    header = pack(header, HDR_HP, a.hp as u32);
    w.push(header);
    w.push(a.id);
    w.push(axis_word(a.x, a.u));
    w.push(axis_word(a.y, a.v));
    w.push(axis_word(a.z, a.w));

    let mut status = pack(0, ST_SP, a.sp as u32);
    status = pack(status, ST_ANIM_HIT, a.anim_hit as u32);
    match &a.kind {
        ActorKind::Player(p) => {
            status = pack(status, ST_DETUNE, p.detune as u32);
            status = pack(status, ST_TRIG, p.trig as u32);
            status = pack(status, ST_MAGS, p.mags as u32);
        }
        ActorKind::Bullet(b) => {
            status = pack(status, ST_DAMAGE, b.damage as u32);
        }
        _ => {}
    }
    w.push(status);

    match &a.kind {
        ActorKind::Player(p) => {
            let [held, spare] = &p.slots;
            let mut slots = pack(0, SLOT_AMMO, held.ammo as u32);
            slots = pack(slots, SLOT_RELOAD, held.reload as u32);
            slots = pack(slots, SLOT_WEAPON2, spare.weapon as u32);
            slots = pack(slots, SLOT_AMMO2, spare.ammo as u32);
            slots = pack(slots, SLOT_RELOAD2, spare.reload as u32);
            w.push(slots);
            w.push_i32(p.client);
            w.push(p.input);
        }
        ActorKind::Item(i) => w.push(pack(0, SLOT_AMMO, i.ammo as u32)),
        ActorKind::Bullet(b) => w.push_i32(b.owner),
        ActorKind::Barrel | ActorKind::Tree => {}
    }
}

/// Read one actor
pub fn decode_actor(r: &mut WordReader<'_>) -> Result<Actor> {
    let header = r.next()?;
    let tag = HDR_TYPE.get(header);
    let actor_type = ActorType::from_tag(tag).ok_or(Error::UnknownActorType(tag))?;
    let weapon = HDR_WEAPON.get(header) as u8;
    let id = r.next()?;
    let (x, u) = read_axis(r.next()?);
    let (y, v) = read_axis(r.next()?);
    let (z, w) = read_axis(r.next()?);
    let status = r.next()?;

    let kind = match actor_type {
        ActorType::Player => {
            let slots = r.next()?;
            let client = r.next_i32()?;
            let input = r.next()?;
            ActorKind::Player(PlayerData {
                client,
                input,
                trig: ST_TRIG.get(status) as u8,
                detune: ST_DETUNE.get(status) as u8,
                mags: ST_MAGS.get(status) as u8,
                slots: [
                    WeaponSlot {
                        weapon,
                        ammo: SLOT_AMMO.get(slots) as u8,
                        reload: SLOT_RELOAD.get(slots) as u8,
                    },
                    WeaponSlot {
                        weapon: SLOT_WEAPON2.get(slots) as u8,
                        ammo: SLOT_AMMO2.get(slots) as u8,
                        reload: SLOT_RELOAD2.get(slots) as u8,
                    },
                ],
            })
        }
        ActorType::Item => ActorKind::Item(ItemData {
            weapon,
            ammo: SLOT_AMMO.get(r.next()?) as u8,
        }),
        ActorType::Bullet => ActorKind::Bullet(BulletData {
            owner: r.next_i32()?,
            damage: ST_DAMAGE.get(status) as u8,
        }),
        ActorType::Barrel => ActorKind::Barrel,
        ActorType::Tree => ActorKind::Tree,
    };

    let mut actor = Actor::new(id, kind, x, y);
    actor.subtype = HDR_SUBTYPE.get(header) as u8;
    actor.z = z;
    actor.u = u;
    actor.v = v;
    actor.w = w;
    actor.lifetime = HDR_LIFETIME.get(header) as u8;
    actor.anim0 = HDR_ANIM0.get(header) as u8;
    actor.hp = HDR_HP.get(header) as u8;
    actor.sp = ST_SP.get(status) as u8;
    actor.anim_hit = ST_ANIM_HIT.get(status) as u8;
    Ok(actor)
}
