use std::{io::Read, ptr};

use rheap::{FreeListHeap, Region, SbrkRegion};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `gdb`, or just watch how the program break moves between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:#x}",
    label,
    std::process::id(),
    SbrkRegion::program_break(),
  );
}

fn print_blocks<R: Region>(heap: &FreeListHeap<R>) {
  for block in heap.blocks() {
    println!(
      "    header {:#x}  payload {:#x}  {:>6} bytes  {}",
      block.header,
      block.payload,
      block.payload_size,
      if block.free { "free" } else { "used" }
    );
  }

  if let Err(err) = heap.check_invariants() {
    println!("    !! {err}");
  }
}

fn main() {
  env_logger::init();

  let mut heap = FreeListHeap::new(SbrkRegion::new());

  print_program_break("start");
  block_until_enter_pressed();

  // 1) Three allocations land back to back at the end of the data segment.
  let a = heap.allocate(10).expect("allocate A");
  let b = heap.allocate(20).expect("allocate B");
  let c = heap.allocate(30).expect("allocate C");
  println!("\n[1] Allocate A(10) B(20) C(30)");
  print_blocks(&heap);
  print_program_break("after A B C");

  unsafe {
    ptr::write_bytes(a.as_ptr(), 0xAA, 12);
    ptr::write_bytes(b.as_ptr(), 0xBB, 20);
    ptr::write_bytes(c.as_ptr(), 0xCC, 32);
  }

  block_until_enter_pressed();

  // 2) B has no free neighbour, so it stays in place as a free block.
  heap.free(b.as_ptr());
  println!("\n[2] Free B");
  print_blocks(&heap);

  block_until_enter_pressed();

  // 3) A merges with the free B.
  heap.free(a.as_ptr());
  println!("\n[3] Free A (merges with B)");
  print_blocks(&heap);

  block_until_enter_pressed();

  // 4) A small request reuses the merged block and splits it.
  let d = heap.allocate(4).expect("allocate D");
  println!("\n[4] Allocate D(4) (first fit + split)");
  println!("    D == old A? {}", d == a);
  print_blocks(&heap);

  block_until_enter_pressed();

  // 5) Growing D past its free neighbour forces a relocation.
  let d = heap.resize(d.as_ptr(), 256).expect("resize D");
  println!("\n[5] Resize D to 256 bytes");
  print_blocks(&heap);
  print_program_break("after resize");

  block_until_enter_pressed();

  // 6) Zeroed memory for ten u32 values.
  let zeroed = heap.zero_allocate(10, 4).expect("zero allocate");
  let values = unsafe { std::slice::from_raw_parts(zeroed.as_ptr() as *const u32, 10) };
  println!("\n[6] zero_allocate(10, 4) -> {:?}", values);
  print_blocks(&heap);

  block_until_enter_pressed();

  // 7) Freeing everything hands the tail back to the OS.
  for ptr in [c, d, zeroed] {
    heap.free(ptr.as_ptr());
  }
  println!("\n[7] Free everything, heap empty? {}", heap.is_empty());
  print_program_break("end");
}
