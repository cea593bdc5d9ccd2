use libc::sbrk;
use rallocator::{Arena, ArenaConfig, FitPolicy, Sbrk};

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr,
    unsafe { sbrk(0) }
  );
}

fn print_blocks(arena: &Arena<Sbrk>) {
  for block in arena.blocks() {
    println!(
      "    @{:<6} size {:<6} {}{}",
      block.offset,
      block.size,
      if block.free { "free" } else { "busy" },
      if block.dirty { " (dirty)" } else { "" },
    );
  }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    )
    .init();

  let fit = match std::env::args().nth(1) {
    Some(name) => name.parse::<FitPolicy>()?,
    None => FitPolicy::default(),
  };
  println!("fit policy: {fit}");

  // The counters of this arena are printed when the process exits.
  let mut arena = Arena::new(Sbrk, ArenaConfig::with_fit(fit));

  print_program_break("start");

  // --------------------------------------------------------------------
  // 1) Allocate space for a u32.
  // --------------------------------------------------------------------
  let first_block = arena.try_allocate(4)?.as_ptr();
  println!("\n[1] Allocate u32");
  print_alloc(4, first_block);

  let first_ptr = first_block as *mut u32;
  unsafe { first_ptr.write(0xDEADBEEF) };
  println!("[1] Value written to first_block = 0x{:X}", unsafe {
    first_ptr.read()
  });

  // --------------------------------------------------------------------
  // 2) Allocate 13 bytes; the request is rounded up to 16.
  // --------------------------------------------------------------------
  let second_block = arena.try_allocate(13)?.as_ptr();
  println!("\n[2] Allocate [u8; 13]");
  print_alloc(13, second_block);
  println!("[2] usable size = {:?}", arena.usable_size(second_block));

  // --------------------------------------------------------------------
  // 3) Allocate 1000 bytes, free them, and carve a smaller block out.
  // --------------------------------------------------------------------
  let big_block = arena.try_allocate(1000)?.as_ptr();
  println!("\n[3] Allocate 1000 bytes");
  print_alloc(1000, big_block);

  arena.deallocate(big_block)?;
  let carved = arena.try_allocate(100)?.as_ptr();
  println!(
    "[3] Allocate 100 after freeing: reused = {}, splits = {}",
    carved == big_block,
    arena.stats().splits
  );
  print_blocks(&arena);

  // --------------------------------------------------------------------
  // 4) Free neighbouring blocks and watch them coalesce.
  // --------------------------------------------------------------------
  arena.deallocate(first_block)?;
  arena.deallocate(second_block)?;
  println!("\n[4] Freed first and second block");
  print_blocks(&arena);

  // --------------------------------------------------------------------
  // 5) Invalid frees are rejected, not undefined.
  // --------------------------------------------------------------------
  if let Err(err) = arena.deallocate(second_block) {
    println!("\n[5] Second free of second_block: {err}");
  }

  // --------------------------------------------------------------------
  // 6) Allocate a large block to observe heap growth.
  // --------------------------------------------------------------------
  print_program_break("before large alloc");
  let big = arena.try_allocate(64 * 1024)?.as_ptr();
  println!("\n[6] Allocate large 64 KiB block");
  print_alloc(64 * 1024, big);
  print_program_break("after large alloc");

  println!("\n[7] End of example. Statistics follow on exit.");
  Ok(())
}
