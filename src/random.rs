//! Random value generation.
//!
//! [`RandomGenerator`] is a decoder that invents its input: it fills any
//! shape with seeded random data. Generated values stay inside what the
//! binary codec can round-trip: floats are finite and strings are
//! alphanumeric, so they never contain a NUL byte.

use crate::grammar::{Region, RegionStack, Scalar, Transcoder, TrivialLayout};
use crate::options::RandomOptions;
use crate::Result;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Per-region generator state.
#[derive(Debug)]
enum Draw {
    Plain,
    Remaining(usize),
    Variant { active: usize },
}

/// Decoder-shaped transcoder producing random values.
#[derive(Debug)]
pub struct RandomGenerator {
    rng: StdRng,
    options: RandomOptions,
    regions: RegionStack<Draw>,
}

impl RandomGenerator {
    #[must_use]
    pub fn new(options: RandomOptions) -> Self {
        RandomGenerator {
            rng: StdRng::seed_from_u64(options.seed),
            options,
            regions: RegionStack::new(),
        }
    }

    fn shallow(&self) -> bool {
        self.regions.depth() < self.options.max_depth
    }

    fn count(&mut self) -> usize {
        if self.shallow() {
            self.rng.gen_range(0..=self.options.max_len)
        } else {
            0
        }
    }

    fn text(&mut self, min_len: usize) -> String {
        let max_len = self.options.max_string_len.max(min_len);
        let len = self.rng.gen_range(min_len..=max_len);
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn pick(&mut self, labels: &[&str], what: &str) -> usize {
        assert!(!labels.is_empty(), "grammar violation: {what} with no labels");
        self.rng.gen_range(0..labels.len())
    }

    fn next(&mut self, region: Region) -> bool {
        match self.regions.top_mut(region) {
            Draw::Remaining(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Transcoder for RandomGenerator {
    const DECODING: bool = true;

    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()> {
        *value = S::from_random_bits(self.rng.next_u64());
        Ok(())
    }

    fn boolean(&mut self, value: &mut bool) -> Result<()> {
        *value = self.rng.gen();
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        *value = self.text(0);
        Ok(())
    }

    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        *index = self.pick(labels, "enumerate");
        Ok(())
    }

    fn optional_begin(&mut self, present: &mut bool) -> Result<()> {
        *present = self.shallow() && !self.rng.gen_bool(self.options.absent_chance());
        self.regions.push(Region::Optional, Draw::Plain);
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Optional);
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let active = self.pick(labels, "variant");
        *index = active;
        self.regions.push(Region::Variant, Draw::Variant { active });
        Ok(())
    }

    fn variant_arm(&mut self, index: usize) -> Result<bool> {
        match self.regions.top_mut(Region::Variant) {
            Draw::Variant { active } => Ok(*active == index),
            _ => unreachable!("variant regions always hold Draw::Variant"),
        }
    }

    fn variant_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Variant);
        Ok(())
    }

    fn object_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.push(Region::Object, Draw::Plain);
        Ok(())
    }

    fn object_field(&mut self, _key: &str) -> Result<()> {
        self.regions.top_mut(Region::Object);
        Ok(())
    }

    fn object_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.pop(Region::Object);
        Ok(())
    }

    fn tuple_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.push(Region::Tuple, Draw::Plain);
        Ok(())
    }

    fn tuple_element(&mut self) -> Result<()> {
        self.regions.top_mut(Region::Tuple);
        Ok(())
    }

    fn tuple_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.pop(Region::Tuple);
        Ok(())
    }

    fn list_begin(&mut self, _trivial: bool) -> Result<()> {
        let count = self.count();
        self.regions.push(Region::List, Draw::Remaining(count));
        Ok(())
    }

    fn list_next(&mut self) -> Result<bool> {
        Ok(self.next(Region::List))
    }

    fn list_end(&mut self) -> Result<()> {
        self.regions.pop(Region::List);
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        let count = self.count();
        self.regions.push(Region::Map, Draw::Remaining(count));
        Ok(())
    }

    fn map_entry(&mut self, key: &mut String) -> Result<bool> {
        if !self.next(Region::Map) {
            return Ok(false);
        }
        *key = self.text(1);
        Ok(true)
    }

    fn map_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Map);
        Ok(())
    }

    fn binary_header(&mut self, _stride: usize, count: &mut usize, fixed: bool) -> Result<()> {
        if !fixed {
            *count = self.count();
        }
        Ok(())
    }

    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.rng.fill_bytes(bytes);
        Ok(())
    }
}
